//! Core data types shared by the codec, dispatcher and store.

use serde::{Deserialize, Serialize};

use crate::error::{PingDefect, PingResult};

/// Service message type carried by ping envelopes.
pub const PING_CONTENT_TYPE: &str = "application/vnd.awala.ping-v1.ping";

/// Service message type carried by pong envelopes.
pub const PONG_CONTENT_TYPE: &str = "application/vnd.awala.ping-v1.pong";

/// HTTP content type of a parcel posted by the gateway.
pub const PARCEL_CONTENT_TYPE: &str = "application/vnd.awala.parcel";

/// A validated ping request.
///
/// `authorization` is the PDA (Parcel Delivery Authorization) the responder
/// must use to reply, and `authorization_chain` the certificates backing it.
/// Both are opaque here: the trust layer produces and checks them. The chain
/// order is whatever the trust layer uses and is never rearranged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub id: String,
    pub authorization: Vec<u8>,
    pub authorization_chain: Vec<Vec<u8>>,
}

impl PingRequest {
    /// Build a request, enforcing the field invariants.
    pub fn new(
        id: impl Into<String>,
        authorization: Vec<u8>,
        authorization_chain: Vec<Vec<u8>>,
    ) -> PingResult<Self> {
        let request = Self {
            id: id.into(),
            authorization,
            authorization_chain,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check that id and PDA are non-empty and no chain entry is empty.
    pub fn validate(&self) -> Result<(), PingDefect> {
        check_ping_fields(&self.id, &self.authorization, &self.authorization_chain)
    }
}

/// The [`PingRequest`] invariants, over borrowed fields.
pub(crate) fn check_ping_fields(
    id: &str,
    authorization: &[u8],
    authorization_chain: &[Vec<u8>],
) -> Result<(), PingDefect> {
    if id.is_empty() {
        return Err(PingDefect::EmptyId);
    }
    if authorization.is_empty() {
        return Err(PingDefect::InvalidPda("PDA is empty".to_string()));
    }
    if let Some(index) = authorization_chain.iter().position(Vec::is_empty) {
        return Err(PingDefect::InvalidChainItem {
            index,
            reason: "certificate is empty".to_string(),
        });
    }
    Ok(())
}

/// Response to a ping. Only ever built from a validated [`PingRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PongResponse {
    pub id: String,
}

impl From<&PingRequest> for PongResponse {
    fn from(ping: &PingRequest) -> Self {
        Self {
            id: ping.id.clone(),
        }
    }
}

/// Credentials an originator attaches to each ping so the responder can reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingCredentials {
    /// PDA issued to the responder
    pub authorization: Vec<u8>,
    /// Certificates backing the PDA, in trust-layer order
    pub authorization_chain: Vec<Vec<u8>>,
    /// Our own credential, used by the transport as the envelope sender
    pub sender_credential: Vec<u8>,
}

/// A locally originated ping, as tracked by the originator store.
///
/// Timestamps are Unix milliseconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRecord {
    pub id: String,
    pub sent_at: i64,
    pub received_at: Option<i64>,
}

impl PingRecord {
    /// A fresh, pending record stamped with the current time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sent_at: chrono::Utc::now().timestamp_millis(),
            received_at: None,
        }
    }

    /// Whether the pong for this ping is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.received_at.is_none()
    }

    /// Round-trip time in milliseconds, once the pong arrived.
    pub fn round_trip_millis(&self) -> Option<i64> {
        self.received_at.map(|received| received - self.sent_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_request_rejects_empty_id() {
        let err = PingRequest::new("", vec![1], vec![]).unwrap_err();
        assert!(err.to_string().contains("ping id is empty"));
    }

    #[test]
    fn test_ping_request_rejects_empty_chain_item() {
        let request = PingRequest {
            id: "p1".to_string(),
            authorization: vec![1, 2],
            authorization_chain: vec![vec![3], vec![]],
        };
        assert_eq!(
            request.validate(),
            Err(PingDefect::InvalidChainItem {
                index: 1,
                reason: "certificate is empty".to_string()
            })
        );
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(PingRequest::new("p1", vec![1], vec![]).is_ok());
    }

    #[test]
    fn test_record_lifecycle_helpers() {
        let mut record = PingRecord::new("p1");
        assert!(record.is_pending());
        assert_eq!(record.round_trip_millis(), None);

        record.received_at = Some(record.sent_at + 250);
        assert!(!record.is_pending());
        assert_eq!(record.round_trip_millis(), Some(250));
    }

    #[test]
    fn test_pong_copies_ping_id() {
        let ping = PingRequest::new("abc", vec![1], vec![]).unwrap();
        assert_eq!(PongResponse::from(&ping).id, "abc");
    }
}
