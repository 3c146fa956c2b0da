//! PoHTTP request checks done before an envelope reaches the dispatcher.
//!
//! A gateway delivers a parcel by POSTing it with the parcel content type and
//! an `X-Awala-Gateway` header naming where replies should go. The HTTP
//! server itself lives outside this crate; these functions only decide.

use std::fmt;

use crate::types::PARCEL_CONTENT_TYPE;

/// Header carrying the address of the delivering gateway.
pub const GATEWAY_HEADER: &str = "X-Awala-Gateway";

/// Address of the gateway a parcel came from. Pongs are delivered there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAddress(String);

impl GatewayAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GatewayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a PoHTTP request was refused before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRejection {
    /// Body is not a parcel
    UnsupportedContentType,
    /// No gateway to reply through
    MissingGateway,
}

impl RequestRejection {
    pub fn status_code(&self) -> u16 {
        match self {
            RequestRejection::UnsupportedContentType => 415,
            RequestRejection::MissingGateway => 400,
        }
    }

    /// Message sent back in the response body.
    pub fn message(&self) -> &'static str {
        match self {
            RequestRejection::UnsupportedContentType => "Invalid Content-Type",
            RequestRejection::MissingGateway => "X-Awala-Gateway header is missing",
        }
    }
}

impl fmt::Display for RequestRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.status_code())
    }
}

/// Validate the headers of an inbound parcel delivery.
pub fn check_request(
    content_type: Option<&str>,
    gateway_header: Option<&str>,
) -> Result<GatewayAddress, RequestRejection> {
    if content_type != Some(PARCEL_CONTENT_TYPE) {
        return Err(RequestRejection::UnsupportedContentType);
    }
    match gateway_header.map(str::trim) {
        Some(address) if !address.is_empty() => Ok(GatewayAddress(address.to_string())),
        _ => Err(RequestRejection::MissingGateway),
    }
}
