//! Error types for the assertion monitor

use thiserror::Error;

/// Result type alias using the monitor's error type
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// Transport failure talking to the RPC node
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A response or account could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The oracle has no assertion account for this id
    #[error("Assertion {0} not found")]
    AssertionNotFound(String),

    /// A signature listed for the oracle has no transaction or metadata
    #[error("Transaction {0} not available")]
    TransactionNotFound(String),

    /// Invalid monitoring parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sink refused a record
    #[error("Sink error: {0}")]
    Sink(String),
}

impl MonitorError {
    pub fn decode(msg: impl Into<String>) -> Self {
        MonitorError::Decode(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        MonitorError::InvalidParameter(msg.into())
    }

    pub fn assertion_not_found(assertion_id: &[u8; 32]) -> Self {
        MonitorError::AssertionNotFound(hex::encode(assertion_id))
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Decode(err.to_string())
    }
}
