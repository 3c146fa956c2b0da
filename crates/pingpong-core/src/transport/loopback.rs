//! In-memory gateway for tests and local demos.
//!
//! Envelopes are postcard-encoded [`PlainEnvelope`]s. They are NOT encrypted
//! or signed: the loopback exists to exercise the ping/pong flow without the
//! real transport SDK, never to carry real traffic.
//!
//! Endpoints register a credential under an address. Sealing for a
//! credential looks its address up; delivering an envelope drops it in the
//! mailbox of its recipient address, where the endpoint collects it with
//! [`LoopbackGateway::take`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Delivery, SealRequest, SecureTransport, UnwrappedEnvelope};
use crate::error::{PingError, PingResult};

/// Current loopback envelope version
pub const PLAIN_ENVELOPE_VERSION: u8 = 1;

/// Unencrypted stand-in for a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainEnvelope {
    pub version: u8,
    pub recipient: String,
    pub sender_credential: Vec<u8>,
    pub sender_chain: Vec<Vec<u8>>,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl PlainEnvelope {
    /// Encode the envelope to bytes.
    pub fn to_bytes(&self) -> PingResult<Vec<u8>> {
        postcard::to_allocvec(self)
            .map_err(|e| PingError::Sealing(format!("Failed to encode envelope: {}", e)))
    }

    /// Decode an envelope from bytes.
    ///
    /// # Errors
    ///
    /// Returns `PingError::InvalidEnvelope` on malformed bytes or an unknown
    /// version.
    pub fn from_bytes(bytes: &[u8]) -> PingResult<Self> {
        let envelope: Self = postcard::from_bytes(bytes)
            .map_err(|e| PingError::InvalidEnvelope(format!("Failed to decode envelope: {}", e)))?;
        if envelope.version != PLAIN_ENVELOPE_VERSION {
            return Err(PingError::InvalidEnvelope(format!(
                "Envelope version {} is not supported",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

/// In-process gateway: a credential directory plus one mailbox per address.
pub struct LoopbackGateway {
    address: String,
    directory: RwLock<HashMap<Vec<u8>, String>>,
    mailboxes: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    fail_deliveries: AtomicBool,
    delivery_delay: Mutex<Option<Duration>>,
    delivered: AtomicUsize,
}

impl LoopbackGateway {
    /// Create a gateway reachable at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            directory: RwLock::new(HashMap::new()),
            mailboxes: Mutex::new(HashMap::new()),
            fail_deliveries: AtomicBool::new(false),
            delivery_delay: Mutex::new(None),
            delivered: AtomicUsize::new(0),
        }
    }

    /// Address deliveries must be made to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Make `credential` reachable at `address`.
    pub fn register_endpoint(&self, address: impl Into<String>, credential: impl Into<Vec<u8>>) {
        self.directory.write().insert(credential.into(), address.into());
    }

    /// Build an envelope for `recipient` directly, bypassing the directory.
    ///
    /// Useful to inject arbitrary payloads, as a remote endpoint would.
    pub fn envelope_for(
        &self,
        recipient: impl Into<String>,
        sender_credential: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> PingResult<Vec<u8>> {
        PlainEnvelope {
            version: PLAIN_ENVELOPE_VERSION,
            recipient: recipient.into(),
            sender_credential: sender_credential.into(),
            sender_chain: Vec::new(),
            content_type: content_type.into(),
            payload: payload.into(),
        }
        .to_bytes()
    }

    /// Drain the mailbox of `address`, oldest envelope first.
    pub fn take(&self, address: &str) -> Vec<Vec<u8>> {
        self.mailboxes
            .lock()
            .get_mut(address)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of envelopes accepted for delivery so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Make every subsequent delivery fail (or succeed again).
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent delivery, to simulate a slow gateway.
    pub fn set_delivery_delay(&self, delay: Option<Duration>) {
        *self.delivery_delay.lock() = delay;
    }
}

impl SecureTransport for LoopbackGateway {
    fn unwrap(&self, envelope: &[u8]) -> PingResult<UnwrappedEnvelope> {
        let envelope = PlainEnvelope::from_bytes(envelope)?;
        Ok(UnwrappedEnvelope {
            recipient: envelope.recipient,
            sender_credential: envelope.sender_credential,
            content_type: envelope.content_type,
            payload: envelope.payload,
        })
    }

    fn seal(&self, request: SealRequest<'_>) -> PingResult<Vec<u8>> {
        let recipient = self
            .directory
            .read()
            .get(request.recipient_credential)
            .cloned()
            .ok_or_else(|| PingError::Sealing("Recipient credential is unknown".to_string()))?;

        PlainEnvelope {
            version: PLAIN_ENVELOPE_VERSION,
            recipient,
            sender_credential: request.sender_credential.to_vec(),
            sender_chain: request.sender_chain.to_vec(),
            content_type: request.content_type.to_string(),
            payload: request.payload.to_vec(),
        }
        .to_bytes()
    }
}

impl Delivery for LoopbackGateway {
    async fn deliver(&self, destination: &str, envelope: Vec<u8>) -> PingResult<()> {
        let delay = *self.delivery_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(PingError::Delivery("Gateway refused the envelope".to_string()));
        }
        if destination != self.address {
            return Err(PingError::Delivery(format!(
                "No gateway listening at {}",
                destination
            )));
        }

        let recipient = PlainEnvelope::from_bytes(&envelope)
            .map_err(|e| PingError::Delivery(e.to_string()))?
            .recipient;
        debug!(%recipient, bytes = envelope.len(), "Loopback gateway queued envelope");

        self.mailboxes
            .lock()
            .entry(recipient)
            .or_default()
            .push_back(envelope);
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_unwrap() {
        let gateway = LoopbackGateway::new("gw");
        gateway.register_endpoint("https://pong.example", b"pong-cert".to_vec());

        let chain = vec![b"ca".to_vec()];
        let bytes = gateway
            .seal(SealRequest {
                payload: b"hello",
                content_type: "text/plain",
                recipient_credential: b"pong-cert",
                sender_credential: b"me",
                sender_chain: &chain,
            })
            .unwrap();

        let opened = gateway.unwrap(&bytes).unwrap();
        assert_eq!(opened.recipient, "https://pong.example");
        assert_eq!(opened.sender_credential, b"me".to_vec());
        assert_eq!(opened.content_type, "text/plain");
        assert_eq!(opened.payload, b"hello".to_vec());
    }

    #[test]
    fn test_seal_unknown_recipient() {
        let gateway = LoopbackGateway::new("gw");
        let err = gateway
            .seal(SealRequest {
                payload: b"x",
                content_type: "t",
                recipient_credential: b"nobody",
                sender_credential: b"me",
                sender_chain: &[],
            })
            .unwrap_err();
        assert!(matches!(err, PingError::Sealing(_)));
    }

    #[test]
    fn test_unwrap_garbage() {
        let gateway = LoopbackGateway::new("gw");
        assert!(matches!(
            gateway.unwrap(b"\xff\xff\xff"),
            Err(PingError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_unknown_version() {
        let gateway = LoopbackGateway::new("gw");
        let bytes = PlainEnvelope {
            version: 9,
            recipient: "a".to_string(),
            sender_credential: vec![1],
            sender_chain: vec![],
            content_type: "t".to_string(),
            payload: vec![],
        }
        .to_bytes()
        .unwrap();
        assert!(matches!(
            gateway.unwrap(&bytes),
            Err(PingError::InvalidEnvelope(_))
        ));
    }

    #[tokio::test]
    async fn test_deliver_routes_to_recipient_mailbox() {
        let gateway = LoopbackGateway::new("gw");
        let envelope = gateway.envelope_for("alice", b"bob".to_vec(), "t", b"hi".to_vec()).unwrap();

        gateway.deliver("gw", envelope.clone()).await.unwrap();

        assert_eq!(gateway.delivered(), 1);
        assert_eq!(gateway.take("alice"), vec![envelope]);
        assert!(gateway.take("alice").is_empty());
    }

    #[tokio::test]
    async fn test_deliver_to_wrong_gateway_fails() {
        let gateway = LoopbackGateway::new("gw");
        let envelope = gateway.envelope_for("alice", b"bob".to_vec(), "t", b"hi".to_vec()).unwrap();
        assert!(gateway.deliver("elsewhere", envelope).await.is_err());
        assert_eq!(gateway.delivered(), 0);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let gateway = LoopbackGateway::new("gw");
        let envelope = gateway.envelope_for("alice", b"bob".to_vec(), "t", b"hi".to_vec()).unwrap();

        gateway.fail_deliveries(true);
        assert!(matches!(
            gateway.deliver("gw", envelope.clone()).await,
            Err(PingError::Delivery(_))
        ));

        gateway.fail_deliveries(false);
        assert!(gateway.deliver("gw", envelope).await.is_ok());
    }
}
