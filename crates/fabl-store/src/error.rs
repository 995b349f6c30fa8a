use fabl_codec::CodecError;
use fabl_types::{AccountId, ContentSum, ItemId, TypeError};

/// Errors from the item store and account directory.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No item with this id, or the item belongs to another account.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("blob not found: {0}")]
    BlobNotFound(ContentSum),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The import string could not be decoded, or encoding failed.
    #[error("import string: {0}")]
    Format(#[from] CodecError),

    /// Bad credentials, unknown account, or unknown token. Deliberately
    /// carries no detail.
    #[error("authentication failed")]
    Authentication,

    /// An item with this id already exists.
    #[error("item id already exists: {0}")]
    Conflict(ItemId),

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] TypeError),

    /// The caller gave up before the write committed; nothing was stored.
    #[error("operation cancelled")]
    Cancelled,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Failure inside the persistence backend.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    /// `true` for errors the caller caused and can fix.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Format(e) => e.is_format_error(),
            Self::InvalidId(_) => true,
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
