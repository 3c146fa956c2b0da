//! Runtime configuration for the responder and originator roles.

use std::time::Duration;

/// Default upper bound for a single outbound delivery.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`crate::Dispatcher`].
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Address inbound envelopes must be bound for (e.g.
    /// `https://pong.example.com`). `None` skips the recipient check.
    pub public_address: Option<String>,
    /// Upper bound for delivering a pong to the gateway.
    pub delivery_timeout: Duration,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            public_address: None,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

impl ResponderConfig {
    /// Config that only accepts envelopes bound for `https://{host}`.
    pub fn for_public_host(host: &str) -> Self {
        Self {
            public_address: Some(public_address(host)),
            ..Self::default()
        }
    }
}

/// Configuration for [`crate::Originator`].
#[derive(Debug, Clone)]
pub struct OriginatorConfig {
    /// Identity credential of the responder pings are sent to
    pub recipient_credential: Vec<u8>,
    /// Address of the local gateway
    pub gateway_address: String,
    /// Upper bound for delivering a ping to the gateway.
    pub delivery_timeout: Duration,
}

impl OriginatorConfig {
    pub fn new(recipient_credential: impl Into<Vec<u8>>, gateway_address: impl Into<String>) -> Self {
        Self {
            recipient_credential: recipient_credential.into(),
            gateway_address: gateway_address.into(),
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

/// Public address of an endpoint served at `host`.
///
/// Accepts a bare host or an already prefixed `https://` address.
pub fn public_address(host: &str) -> String {
    if host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responder_defaults() {
        let config = ResponderConfig::default();
        assert!(config.public_address.is_none());
        assert_eq!(config.delivery_timeout, DEFAULT_DELIVERY_TIMEOUT);
    }

    #[test]
    fn test_public_address_prefix() {
        assert_eq!(public_address("pong.example"), "https://pong.example");
        assert_eq!(public_address("https://pong.example"), "https://pong.example");
        assert_eq!(
            ResponderConfig::for_public_host("pong.example").public_address,
            Some("https://pong.example".to_string())
        );
    }
}
