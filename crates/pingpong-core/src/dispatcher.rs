//! Responder side: turn inbound ping envelopes into pong envelopes.
//!
//! ## Pipeline
//!
//! ```text
//! envelope ──unwrap──► recipient check ──► content type check
//!                                                │
//!        Rejected ◄── any of the above fails     ▼
//!                                         deserialize_ping
//!        Ignored  ◄── malformed payload ─────────┤
//!                                                ▼
//!                                  serialize_pong → seal → deliver
//!        DeliveryFailed ◄── seal/deliver error ──┤
//!        Responded      ◄────────────────────────┘
//! ```
//!
//! A malformed ping inside a valid envelope is not the gateway's fault, so it
//! is acknowledged (`Ignored`) rather than rejected.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::codec::{deserialize_ping, serialize_pong};
use crate::config::ResponderConfig;
use crate::error::{PingError, PingResult};
use crate::transport::{Delivery, SealRequest, SecureTransport, UnwrappedEnvelope};
use crate::types::{PingRequest, PongResponse, PING_CONTENT_TYPE, PONG_CONTENT_TYPE};

pub mod pohttp;

pub use pohttp::{check_request, GatewayAddress, RequestRejection};

/// What happened to one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A pong for this ping id was handed to the gateway
    Responded(String),
    /// The envelope was valid but its ping payload was not; no pong sent
    Ignored(String),
    /// The envelope itself was unacceptable; no pong sent, not acknowledged
    Rejected(String),
    /// The ping was valid but the pong could not be delivered
    DeliveryFailed {
        /// Id of the ping being answered
        id: String,
        /// Underlying transport error
        cause: String,
    },
}

impl Outcome {
    /// Whether the inbound envelope counts as consumed.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self, Outcome::Rejected(_))
    }

    /// HTTP status a PoHTTP endpoint answers the gateway with.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Responded(_) | Outcome::Ignored(_) => 202,
            Outcome::Rejected(_) => 403,
            Outcome::DeliveryFailed { .. } => 500,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Responded(id) => write!(f, "Responded to ping {}", id),
            Outcome::Ignored(reason) => write!(f, "Ignored: {}", reason),
            Outcome::Rejected(reason) => write!(f, "Rejected: {}", reason),
            Outcome::DeliveryFailed { id, cause } => {
                write!(f, "Failed to deliver pong for {}: {}", id, cause)
            }
        }
    }
}

/// Handles inbound ping envelopes.
///
/// Each call to [`Dispatcher::handle_inbound`] is independent, so one
/// dispatcher can serve many envelopes concurrently.
pub struct Dispatcher<T, D> {
    config: ResponderConfig,
    transport: Arc<T>,
    delivery: Arc<D>,
}

impl<T, D> Dispatcher<T, D>
where
    T: SecureTransport,
    D: Delivery,
{
    pub fn new(config: ResponderConfig, transport: Arc<T>, delivery: Arc<D>) -> Self {
        Self {
            config,
            transport,
            delivery,
        }
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Process one envelope received through the gateway at `gateway_address`.
    ///
    /// At most one outbound envelope is attempted, and only for a valid ping.
    pub async fn handle_inbound(&self, gateway_address: &str, envelope: &[u8]) -> Outcome {
        let unwrapped = match self.transport.unwrap(envelope) {
            Ok(unwrapped) => unwrapped,
            Err(err) => {
                info!(error = %err, "Refusing malformed or invalid envelope");
                return Outcome::Rejected("invalid envelope".to_string());
            }
        };

        if let Some(expected) = &self.config.public_address {
            if &unwrapped.recipient != expected {
                info!(
                    recipient = %unwrapped.recipient,
                    "Refusing envelope bound for another endpoint"
                );
                return Outcome::Rejected("invalid recipient".to_string());
            }
        }

        if unwrapped.content_type != PING_CONTENT_TYPE {
            info!(
                content_type = %unwrapped.content_type,
                "Refusing envelope with unexpected service message type"
            );
            return Outcome::Rejected("unexpected content type".to_string());
        }

        let ping = match deserialize_ping(&unwrapped.payload) {
            Ok(ping) => ping,
            Err(err) => {
                info!(error = %err, "Ignoring invalid/malformed ping");
                return Outcome::Ignored(err.to_string());
            }
        };

        match self.respond(gateway_address, &unwrapped, &ping).await {
            Ok(()) => {
                debug!(ping_id = %ping.id, gateway = gateway_address, "Sent pong");
                Outcome::Responded(ping.id)
            }
            Err(err) => {
                error!(
                    ping_id = %ping.id,
                    gateway = gateway_address,
                    error = %err,
                    "Failed to send pong"
                );
                Outcome::DeliveryFailed {
                    id: ping.id,
                    cause: err.to_string(),
                }
            }
        }
    }

    async fn respond(
        &self,
        gateway_address: &str,
        inbound: &UnwrappedEnvelope,
        ping: &PingRequest,
    ) -> PingResult<()> {
        let pong = serialize_pong(&PongResponse::from(ping).id);
        let envelope = self.transport.seal(SealRequest {
            payload: &pong,
            content_type: PONG_CONTENT_TYPE,
            recipient_credential: &inbound.sender_credential,
            sender_credential: &ping.authorization,
            sender_chain: &ping.authorization_chain,
        })?;

        let timeout = self.config.delivery_timeout;
        tokio::time::timeout(timeout, self.delivery.deliver(gateway_address, envelope))
            .await
            .map_err(|_| PingError::DeliveryTimeout(timeout))?
    }
}
