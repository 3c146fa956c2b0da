//! Edge case and boundary condition tests
//!
//! These tests verify the codec and store handle unusual inputs and
//! error conditions correctly.

use pingpong_core::{
    deserialize_ping, deserialize_pong, serialize_ping, PingDefect, PingError, PingStore,
};

fn defect(bytes: &[u8]) -> PingDefect {
    match deserialize_ping(bytes) {
        Err(PingError::MalformedPing(defect)) => defect,
        other => panic!("expected MalformedPing, got {:?}", other),
    }
}

// ============================================================================
// Malformed Ping Tests
// ============================================================================

/// Every documented failure mode yields a distinct defect
#[test]
fn test_failure_modes_are_distinguishable() {
    assert!(matches!(defect(b""), PingDefect::NotJson(_)));
    assert!(matches!(
        defect(b"\"just a string\""),
        PingDefect::NotAnObject
    ));
    assert!(matches!(
        defect(br#"{"pda":"YQ==","pda_chain":[]}"#),
        PingDefect::MissingId
    ));
    assert!(matches!(
        defect(br#"{"id":"p1","pda":"@@@","pda_chain":[]}"#),
        PingDefect::InvalidPda(_)
    ));
    assert!(matches!(
        defect(br#"{"id":"p1","pda":"YQ==","pda_chain":{}}"#),
        PingDefect::ChainNotArray
    ));
    assert!(matches!(
        defect(br#"{"id":"p1","pda":"YQ==","pda_chain":["YQ==","YQ==","!!"]}"#),
        PingDefect::InvalidChainItem { index: 2, .. }
    ));
}

/// Defects carry a readable reason
#[test]
fn test_reasons_are_human_readable() {
    let reason = PingError::from(defect(br#"{"id":"p1","pda_chain":[]}"#)).to_string();
    assert!(reason.starts_with("Malformed ping: invalid PDA"), "{}", reason);
}

/// Non-UTF-8 input is treated as malformed JSON
#[test]
fn test_binary_input() {
    assert!(matches!(
        defect(&[0x00, 0xff, 0x10, 0x80]),
        PingDefect::NotJson(_)
    ));
}

/// `null` fields behave like missing fields
#[test]
fn test_null_fields() {
    assert_eq!(
        defect(br#"{"id":null,"pda":"YQ==","pda_chain":[]}"#),
        PingDefect::MissingId
    );
    assert_eq!(
        defect(br#"{"id":"p1","pda":"YQ==","pda_chain":null}"#),
        PingDefect::ChainNotArray
    );
}

/// Base64 wrapped at line boundaries, or ending in a newline as platform
/// encoders emit it, decodes to the same bytes as the compact form
#[test]
fn test_wrapped_base64_decodes() {
    let wrapped = br#"{"id":"p1","pda":"YWJj\nZGVm\n","pda_chain":["YQ==\r\n"]}"#;
    let compact = br#"{"id":"p1","pda":"YWJjZGVm","pda_chain":["YQ=="]}"#;

    let wrapped = deserialize_ping(wrapped).unwrap();
    assert_eq!(wrapped, deserialize_ping(compact).unwrap());
    assert_eq!(wrapped.authorization, b"abcdef".to_vec());
}

/// Skipping whitespace does not loosen the alphabet
#[test]
fn test_wrapped_base64_with_bad_symbol_is_rejected() {
    let input = br#"{"id":"p1","pda":"YWJj\nZG*m","pda_chain":[]}"#;
    assert!(matches!(defect(input), PingDefect::InvalidPda(_)));
}

/// Large chains survive a round trip intact
#[test]
fn test_long_chain_round_trip() {
    let chain: Vec<Vec<u8>> = (0..64u8).map(|i| vec![i; (i as usize) + 1]).collect();
    let bytes = serialize_ping("long", &[1, 2, 3], &chain).unwrap();
    assert_eq!(deserialize_ping(&bytes).unwrap().authorization_chain, chain);
}

/// Whitespace-only id is accepted verbatim (only emptiness is rejected)
#[test]
fn test_whitespace_id() {
    let bytes = serialize_ping("   ", &[1], &[]).unwrap();
    assert_eq!(deserialize_ping(&bytes).unwrap().id, "   ");
}

// ============================================================================
// Pong Tests
// ============================================================================

#[test]
fn test_pong_keeps_surrounding_whitespace() {
    assert_eq!(deserialize_pong(b" p1 \n").unwrap(), " p1 \n");
}

#[test]
fn test_pong_truncated_multibyte() {
    let mut bytes = "é".as_bytes().to_vec();
    bytes.pop();
    assert!(matches!(
        deserialize_pong(&bytes),
        Err(PingError::MalformedPong(_))
    ));
}

// ============================================================================
// Store Scenario Tests
// ============================================================================

/// originate → correlate → correlate(unknown) → clear
#[test]
fn test_store_scenario() {
    let store = PingStore::in_memory();

    store.originate("p1").unwrap();
    let records = store.list();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "p1");
    assert!(records[0].received_at.is_none());

    store.correlate("p1").unwrap();
    let records = store.list();
    assert_eq!(records.len(), 1);
    assert!(records[0].received_at.is_some());

    let before = store.list();
    store.correlate("unknown").unwrap();
    assert_eq!(store.list(), before);

    store.clear().unwrap();
    assert!(store.list().is_empty());
}

/// clear on an empty store is fine
#[test]
fn test_clear_empty_store() {
    let store = PingStore::in_memory();
    store.clear().unwrap();
    assert!(store.list().is_empty());
}

/// received_at is not before sent_at
#[test]
fn test_received_not_before_sent() {
    let store = PingStore::in_memory();
    store.originate("p1").unwrap();
    store.correlate("p1").unwrap();
    let record = store.get("p1").unwrap();
    assert!(record.round_trip_millis().unwrap() >= 0);
}
