use thiserror::Error;

/// Errors from import string encoding and decoding.
///
/// Every variant except [`CodecError::Compress`] means the caller supplied a
/// malformed import string and can recover by correcting it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty import string")]
    Empty,

    #[error("unrecognized format marker {0:?}")]
    UnknownVersion(char),

    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("corrupt compressed stream: {0}")]
    Corrupt(String),

    #[error("compressed stream is truncated")]
    Truncated,

    #[error("decoded payload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("compression failed: {0}")]
    Compress(String),
}

impl CodecError {
    /// `true` when the input string was at fault.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::Compress(_))
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
