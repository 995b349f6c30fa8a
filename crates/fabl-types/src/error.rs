use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("timestamp {0} ms does not fit in 48 bits")]
    TimestampOverflow(u64),
}
