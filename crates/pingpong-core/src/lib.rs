//! Ping/Pong Core Library
//!
//! Codec, responder dispatcher and originator store for endpoints that
//! exchange ping/pong messages over a store-and-forward network through a
//! local gateway.
//!
//! ## Overview
//!
//! ```text
//!  Originator                                   Responder
//!  ──────────                                   ─────────
//!  send_ping ─► serialize_ping ─► PingStore::originate
//!           └─► seal + deliver ──► gateway ──► Dispatcher::handle_inbound
//!                                              ├─ unwrap, check recipient/type
//!                                              ├─ deserialize_ping
//!                                              └─ serialize_pong ─► seal + deliver
//!  handle_inbound ◄─────────────── gateway ◄───┘
//!  └─ deserialize_pong ─► PingStore::correlate
//! ```
//!
//! Envelope encryption and gateway delivery belong to an external SDK and are
//! consumed through the [`transport`] traits. [`transport::LoopbackGateway`]
//! is an in-memory stand-in for tests and demos.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use pingpong_core::{Dispatcher, LoopbackGateway, ResponderConfig};
//!
//! let gateway = Arc::new(LoopbackGateway::new("http://127.0.0.1:276"));
//! let dispatcher = Dispatcher::new(
//!     ResponderConfig::for_public_host("pong.example.com"),
//!     gateway.clone(),
//!     gateway.clone(),
//! );
//!
//! let outcome = dispatcher.handle_inbound(gateway.address(), &envelope).await;
//! println!("{} -> HTTP {}", outcome, outcome.status_code());
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod originator;
pub mod store;
pub mod transport;
pub mod types;

// Re-exports
pub use codec::{deserialize_ping, deserialize_pong, serialize_ping, serialize_pong};
pub use config::{OriginatorConfig, ResponderConfig};
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{PingDefect, PingError, PingResult};
pub use originator::{Originator, PongReceipt};
pub use store::{MemoryBackend, PingStore, RecordBackend, RedbBackend, Subscription};
pub use transport::{Delivery, LoopbackGateway, SecureTransport, UnwrappedEnvelope};
pub use types::*;
