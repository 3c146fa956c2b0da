//! Secure-transport and delivery collaborators.
//!
//! The cryptographic envelope (parcel) format and the gateway connection are
//! owned by an external SDK. The core only talks to them through the two
//! traits here:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SecureTransport                                             │
//! │  ├── unwrap: envelope bytes → (recipient, sender, type, data)│
//! │  └── seal:   data + type + credentials → envelope bytes      │
//! │                                                              │
//! │  Delivery                                                    │
//! │  └── deliver: (gateway address, envelope bytes) → ok / err   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`loopback::LoopbackGateway`] implements both in memory for tests and the
//! CLI demo.

use std::future::Future;

use crate::error::PingResult;

pub mod loopback;

pub use loopback::{LoopbackGateway, PlainEnvelope};

/// The result of opening an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedEnvelope {
    /// Address the envelope was sent to
    pub recipient: String,
    /// Credential of the sender; replies are addressed to it
    pub sender_credential: Vec<u8>,
    /// Service message type (e.g. [`crate::PING_CONTENT_TYPE`])
    pub content_type: String,
    /// Service message content
    pub payload: Vec<u8>,
}

/// Everything the transport needs to build an outbound envelope.
#[derive(Debug, Clone, Copy)]
pub struct SealRequest<'a> {
    pub payload: &'a [u8],
    pub content_type: &'a str,
    /// Credential identifying (and encrypting for) the recipient
    pub recipient_credential: &'a [u8],
    /// Credential the envelope is sent under (a PDA, when replying)
    pub sender_credential: &'a [u8],
    /// Chain backing `sender_credential`, order preserved
    pub sender_chain: &'a [Vec<u8>],
}

/// Opens and builds encrypted envelopes.
///
/// Implementations hold their own private key material.
pub trait SecureTransport: Send + Sync {
    /// Decrypt and structurally validate an envelope.
    ///
    /// Fails with `PingError::InvalidEnvelope` on any cryptographic or
    /// structural problem.
    fn unwrap(&self, envelope: &[u8]) -> PingResult<UnwrappedEnvelope>;

    /// Build an envelope for `request.recipient_credential`.
    fn seal(&self, request: SealRequest<'_>) -> PingResult<Vec<u8>>;
}

/// Hands envelopes to a gateway.
///
/// May be slow; callers bound it with a timeout.
pub trait Delivery: Send + Sync {
    fn deliver(
        &self,
        destination: &str,
        envelope: Vec<u8>,
    ) -> impl Future<Output = PingResult<()>> + Send;
}
