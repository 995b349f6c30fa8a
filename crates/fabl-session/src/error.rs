use thiserror::Error;

/// Errors from the session layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No session is attached to the request, or it has no account bound.
    #[error("not authenticated")]
    Unauthenticated,

    /// The cookie is not a well-formed `payload.mac` envelope.
    #[error("malformed session cookie: {0}")]
    Malformed(String),

    /// No configured key produced a matching MAC.
    #[error("session cookie signature mismatch")]
    BadSignature,

    /// The envelope is older than the configured max age.
    #[error("session cookie expired")]
    Expired,

    #[error("invalid session key: {0}")]
    InvalidKey(String),

    #[error("session payload encoding failed: {0}")]
    Encode(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
