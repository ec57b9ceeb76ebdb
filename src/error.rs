//! Error types and result handling for pii-transform.
//!
//! This module defines the main error type [`Error`], a convenience
//! [`Result`] type alias used throughout the crate, and the per-record
//! [`TransformError`] returned by the masking transform.
//!
//! # Example
//!
//! ```rust
//! use pii_transform::{Error, Result};
//!
//! fn lookup_schema(id: u32) -> Result<String> {
//!     Err(Error::Registry(format!("schema {} not found", id)))
//! }
//!
//! match lookup_schema(7) {
//!     Ok(schema) => println!("{}", schema),
//!     Err(Error::Registry(msg)) => eprintln!("Registry error: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// The main error type for pii-transform operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration value at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed date/timestamp shape or otherwise unparseable input.
    #[error("Format error: {0}")]
    Format(String),

    /// Event kind with no known converter.
    #[error("Unsupported event type: {0}")]
    UnsupportedEventType(String),

    /// Schema fetch, lookup or parse failure.
    #[error("Schema registry error: {0}")]
    Registry(String),

    /// Framing or Avro binary encode/decode failure.
    #[error("Wire format error: {0}")]
    Wire(String),

    /// Begin/produce/commit/abort failure on the bus.
    #[error("Transaction error: {message}")]
    Transaction {
        /// Description of the failed step, including the underlying cause
        message: String,
    },

    /// Kafka client or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// HTTP transport error talking to the schema registry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from reading or writing event files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

/// A convenient Result type alias for pii-transform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Processing states of a single record inside the masking transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    Received,
    Decoded,
    Evaluated,
    Encoded,
    Emitted,
}

impl fmt::Display for TransformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformState::Received => "received",
            TransformState::Decoded => "decoded",
            TransformState::Evaluated => "evaluated",
            TransformState::Encoded => "encoded",
            TransformState::Emitted => "emitted",
        };
        f.write_str(name)
    }
}

/// Failure of one transform invocation.
///
/// `state` is the state the record was in when the failure was detected:
/// `Received` for header/registry/decode failures, `Decoded` when the decoded
/// record does not have the expected shape, `Encoded` when re-encoding with
/// the destination schema or handing the result to the writer fails.
#[derive(Error, Debug)]
#[error("transform failed in state '{state}': {source}")]
pub struct TransformError {
    pub state: TransformState,
    #[source]
    pub source: Error,
}

impl TransformError {
    pub fn new(state: TransformState, source: Error) -> Self {
        Self { state, source }
    }
}
