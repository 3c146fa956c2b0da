//! Error types for the ping/pong core

use std::time::Duration;

use thiserror::Error;

/// The specific rule a ping payload broke.
///
/// Callers that only care about success vs failure can ignore this; it is
/// carried so logs say exactly which part of the payload was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PingDefect {
    /// Payload is not a JSON document
    #[error("ping is not valid JSON: {0}")]
    NotJson(String),

    /// Payload parsed, but the top level is not an object
    #[error("ping is not a JSON object")]
    NotAnObject,

    /// `id` is missing or not a string
    #[error("ping id is missing or it is not a string")]
    MissingId,

    /// `id` is an empty string
    #[error("ping id is empty")]
    EmptyId,

    /// `pda` is missing, malformed or empty
    #[error("invalid PDA: {0}")]
    InvalidPda(String),

    /// `pda_chain` is missing or not an array
    #[error("PDA chain is not an array")]
    ChainNotArray,

    /// One `pda_chain` entry is malformed or empty
    #[error("PDA chain contains invalid item at index {index}: {reason}")]
    InvalidChainItem {
        /// Position of the offending entry
        index: usize,
        /// What was wrong with it
        reason: String,
    },
}

/// Main error type for ping/pong operations
#[derive(Error, Debug)]
pub enum PingError {
    /// Ping payload does not conform to the wire format
    #[error("Malformed ping: {0}")]
    MalformedPing(#[from] PingDefect),

    /// Pong payload could not be decoded as a UTF-8 identifier
    #[error("Malformed pong: {0}")]
    MalformedPong(String),

    /// A ping with this id has already been originated
    #[error("Duplicate ping id: {0}")]
    DuplicateId(String),

    /// The secure transport could not open an envelope
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The secure transport could not build an outbound envelope
    #[error("Sealing error: {0}")]
    Sealing(String),

    /// Outbound delivery to the gateway failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Outbound delivery did not finish in time
    #[error("Delivery timed out after {0:?}")]
    DeliveryTimeout(Duration),

    /// Error during serialization/deserialization of stored data
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error during storage operations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using PingError
pub type PingResult<T> = Result<T, PingError>;
