//! Originator side: send pings and match the pongs that come back.

use std::sync::Arc;

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::codec::{deserialize_pong, serialize_ping};
use crate::config::OriginatorConfig;
use crate::error::{PingError, PingResult};
use crate::store::{PingStore, RecordBackend};
use crate::transport::{Delivery, SealRequest, SecureTransport};
use crate::types::{PingCredentials, PingRecord, PING_CONTENT_TYPE, PONG_CONTENT_TYPE};

/// What became of an inbound message on the originator side.
///
/// Every variant means the message was consumed and can be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PongReceipt {
    /// A pending ping was marked as answered
    Correlated(String),
    /// Valid pong, but for an unknown or already answered ping
    Unmatched(String),
    /// Pong payload could not be decoded
    Malformed(String),
    /// Not a pong at all
    Discarded {
        /// Service message type that was received
        content_type: String,
    },
}

/// Sends pings through the gateway and tracks them in a [`PingStore`].
pub struct Originator<T, D, B> {
    config: OriginatorConfig,
    credentials: PingCredentials,
    transport: Arc<T>,
    delivery: Arc<D>,
    store: Arc<PingStore<B>>,
}

impl<T, D, B> Originator<T, D, B>
where
    T: SecureTransport,
    D: Delivery,
    B: RecordBackend,
{
    pub fn new(
        config: OriginatorConfig,
        credentials: PingCredentials,
        transport: Arc<T>,
        delivery: Arc<D>,
        store: Arc<PingStore<B>>,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            delivery,
            store,
        }
    }

    pub fn store(&self) -> &Arc<PingStore<B>> {
        &self.store
    }

    /// Send a new ping with a fresh ULID.
    ///
    /// The record is stored as soon as the payload is built, before any
    /// delivery attempt; if delivery then fails the error is returned and
    /// the record stays pending.
    pub async fn send_ping(&self) -> PingResult<PingRecord> {
        let id = Ulid::new().to_string();
        let payload = serialize_ping(
            &id,
            &self.credentials.authorization,
            &self.credentials.authorization_chain,
        )?;
        let record = self.store.originate(&id)?;

        let envelope = self.transport.seal(SealRequest {
            payload: &payload,
            content_type: PING_CONTENT_TYPE,
            recipient_credential: &self.config.recipient_credential,
            sender_credential: &self.credentials.sender_credential,
            sender_chain: &[],
        })?;

        let timeout = self.config.delivery_timeout;
        tokio::time::timeout(
            timeout,
            self.delivery.deliver(&self.config.gateway_address, envelope),
        )
        .await
        .map_err(|_| PingError::DeliveryTimeout(timeout))??;

        info!(ping_id = %id, gateway = %self.config.gateway_address, "Sent ping");
        Ok(record)
    }

    /// Process one message collected from the gateway.
    ///
    /// # Errors
    ///
    /// Returns `PingError::InvalidEnvelope` if the envelope cannot be opened;
    /// such a message should not be acknowledged.
    pub fn handle_inbound(&self, envelope: &[u8]) -> PingResult<PongReceipt> {
        let unwrapped = self.transport.unwrap(envelope)?;

        if unwrapped.content_type != PONG_CONTENT_TYPE {
            debug!(content_type = %unwrapped.content_type, "Discarding non-pong message");
            return Ok(PongReceipt::Discarded {
                content_type: unwrapped.content_type,
            });
        }

        let id = match deserialize_pong(&unwrapped.payload) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "Discarding malformed pong");
                return Ok(PongReceipt::Malformed(err.to_string()));
            }
        };

        if self.store.correlate(&id)? {
            info!(ping_id = %id, "Received pong");
            Ok(PongReceipt::Correlated(id))
        } else {
            Ok(PongReceipt::Unmatched(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::transport::LoopbackGateway;

    const GATEWAY: &str = "gw";
    const PONG_ADDRESS: &str = "https://pong.example";
    const PONG_CERT: &[u8] = b"pong-identity";
    const OUR_ADDRESS: &str = "0ourselves";
    const OUR_CERT: &[u8] = b"our-identity";

    fn setup() -> (
        Arc<LoopbackGateway>,
        Originator<LoopbackGateway, LoopbackGateway, MemoryBackend>,
    ) {
        let gateway = Arc::new(LoopbackGateway::new(GATEWAY));
        gateway.register_endpoint(PONG_ADDRESS, PONG_CERT.to_vec());
        gateway.register_endpoint(OUR_ADDRESS, OUR_CERT.to_vec());

        let credentials = PingCredentials {
            authorization: b"pda".to_vec(),
            authorization_chain: vec![b"our-identity".to_vec()],
            sender_credential: OUR_CERT.to_vec(),
        };
        let originator = Originator::new(
            OriginatorConfig::new(PONG_CERT.to_vec(), GATEWAY),
            credentials,
            gateway.clone(),
            gateway.clone(),
            Arc::new(PingStore::in_memory()),
        );
        (gateway, originator)
    }

    fn pong(gateway: &LoopbackGateway, payload: &[u8]) -> Vec<u8> {
        gateway
            .envelope_for(OUR_ADDRESS, b"pda".to_vec(), PONG_CONTENT_TYPE, payload.to_vec())
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_ping_records_and_delivers() {
        let (gateway, originator) = setup();

        let record = originator.send_ping().await.unwrap();
        assert!(record.is_pending());
        assert_eq!(originator.store().list(), vec![record.clone()]);

        let sent = gateway.take(PONG_ADDRESS);
        assert_eq!(sent.len(), 1);
        let opened = gateway.unwrap(&sent[0]).unwrap();
        assert_eq!(opened.content_type, PING_CONTENT_TYPE);
        let ping = crate::codec::deserialize_ping(&opened.payload).unwrap();
        assert_eq!(ping.id, record.id);
        assert_eq!(ping.authorization_chain, vec![b"our-identity".to_vec()]);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_pending_record() {
        let (gateway, originator) = setup();
        gateway.fail_deliveries(true);

        assert!(matches!(
            originator.send_ping().await,
            Err(PingError::Delivery(_))
        ));
        let records = originator.store().list();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_pending());
    }

    #[tokio::test]
    async fn test_pong_correlates() {
        let (gateway, originator) = setup();
        let record = originator.send_ping().await.unwrap();

        let receipt = originator
            .handle_inbound(&pong(&gateway, record.id.as_bytes()))
            .unwrap();
        assert_eq!(receipt, PongReceipt::Correlated(record.id.clone()));
        assert!(!originator.store().get(&record.id).unwrap().is_pending());

        // Duplicate delivery of the same pong
        let receipt = originator
            .handle_inbound(&pong(&gateway, record.id.as_bytes()))
            .unwrap();
        assert_eq!(receipt, PongReceipt::Unmatched(record.id));
    }

    #[test]
    fn test_non_pong_is_discarded() {
        let (gateway, originator) = setup();
        let envelope = gateway
            .envelope_for(OUR_ADDRESS, b"x".to_vec(), PING_CONTENT_TYPE, b"{}".to_vec())
            .unwrap();
        assert_eq!(
            originator.handle_inbound(&envelope).unwrap(),
            PongReceipt::Discarded {
                content_type: PING_CONTENT_TYPE.to_string()
            }
        );
    }

    #[test]
    fn test_malformed_pong() {
        let (gateway, originator) = setup();
        let receipt = originator.handle_inbound(&pong(&gateway, &[0xff])).unwrap();
        assert!(matches!(receipt, PongReceipt::Malformed(_)));
    }

    #[test]
    fn test_invalid_envelope_is_an_error() {
        let (_gateway, originator) = setup();
        assert!(matches!(
            originator.handle_inbound(b"junk"),
            Err(PingError::InvalidEnvelope(_))
        ));
    }
}
