//! Ping and pong payload codec.
//!
//! ## Wire Format
//!
//! A ping is a JSON object with exactly three fields:
//!
//! ```text
//! {"id":"<string>","pda":"<base64>","pda_chain":["<base64>", ...]}
//! ```
//!
//! Base64 uses the standard alphabet with padding. Output never contains line
//! breaks; on input, ASCII whitespace is skipped so that line-wrapped or
//! newline-terminated encodings decode to the same bytes. The chain keeps the
//! order it was given in.
//!
//! A pong is the UTF-8 encoding of the ping id with no framing at all; the
//! envelope's content type is what marks it as a pong.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PingDefect, PingError, PingResult};
use crate::types::{check_ping_fields, PingRequest};

/// Serialized field order is the declaration order, which keeps output stable.
#[derive(Serialize)]
struct PingWire<'a> {
    id: &'a str,
    pda: String,
    pda_chain: Vec<String>,
}

/// Encode a ping request into its JSON payload.
///
/// Identical inputs always produce identical bytes.
///
/// # Errors
///
/// Returns `PingError::MalformedPing` if the inputs break the
/// [`PingRequest`] invariants (empty id, empty PDA, empty chain entry).
pub fn serialize_ping(
    id: &str,
    authorization: &[u8],
    authorization_chain: &[Vec<u8>],
) -> PingResult<Vec<u8>> {
    check_ping_fields(id, authorization, authorization_chain)?;

    let wire = PingWire {
        id,
        pda: STANDARD.encode(authorization),
        pda_chain: authorization_chain
            .iter()
            .map(|cert| STANDARD.encode(cert))
            .collect(),
    };
    serde_json::to_vec(&wire).map_err(|e| PingError::Serialization(e.to_string()))
}

/// Decode and validate a ping payload.
///
/// Fields other than `id`, `pda` and `pda_chain` are ignored.
pub fn deserialize_ping(bytes: &[u8]) -> PingResult<PingRequest> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| PingDefect::NotJson(e.to_string()))?;
    let object = value.as_object().ok_or(PingDefect::NotAnObject)?;

    let id = match object.get("id") {
        Some(Value::String(id)) => id,
        _ => return Err(PingDefect::MissingId.into()),
    };
    if id.is_empty() {
        return Err(PingDefect::EmptyId.into());
    }

    let authorization = decode_certificate(object.get("pda")).map_err(PingDefect::InvalidPda)?;

    let chain = match object.get("pda_chain") {
        Some(Value::Array(items)) => items,
        _ => return Err(PingDefect::ChainNotArray.into()),
    };
    let authorization_chain = chain
        .iter()
        .enumerate()
        .map(|(index, item)| {
            decode_certificate(Some(item))
                .map_err(|reason| PingDefect::InvalidChainItem { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PingRequest {
        id: id.clone(),
        authorization,
        authorization_chain,
    })
}

fn decode_certificate(value: Option<&Value>) -> Result<Vec<u8>, String> {
    let encoded = match value {
        Some(Value::String(encoded)) => encoded,
        _ => return Err("certificate is missing or not a string".to_string()),
    };
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| format!("certificate is not base64-encoded: {}", e))?;
    if der.is_empty() {
        return Err("certificate is empty".to_string());
    }
    Ok(der)
}

/// Encode a pong payload: the raw UTF-8 bytes of the ping id.
pub fn serialize_pong(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Decode a pong payload back into the ping id.
///
/// # Errors
///
/// Returns `PingError::MalformedPong` if the payload is empty or not UTF-8.
pub fn deserialize_pong(bytes: &[u8]) -> PingResult<String> {
    if bytes.is_empty() {
        return Err(PingError::MalformedPong("pong payload is empty".to_string()));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|e| PingError::MalformedPong(format!("pong is not UTF-8: {}", e)))
}
