use fabl_types::{AccountId, ContentSum, ItemId};

use crate::error::StoreResult;
use crate::model::{Account, CreateOutcome, ItemRecord, NewItem};

/// Persistence backend for items and blobs.
///
/// All implementations must satisfy these invariants:
/// - Blobs are keyed by content sum and inserted only if absent; an existing
///   blob row is never replaced.
/// - `insert_item` is atomic: the blob insert and the item insert either
///   both take effect or neither does.
/// - An item id that already exists fails with `StoreError::Conflict` and
///   leaves the store unchanged.
/// - A `NewItem` whose cancellation is set by the time of commit fails with
///   `StoreError::Cancelled` and leaves the store unchanged.
/// - Reads need no coordination with writers; a read racing an insert may
///   or may not observe it.
pub trait ItemRepository: Send + Sync {
    /// Insert the blob (if absent) and the item row in one transaction.
    fn insert_item(&self, item: &NewItem<'_>) -> StoreResult<CreateOutcome>;

    /// Point lookup of an item row. `Ok(None)` if absent.
    fn item(&self, id: &ItemId) -> StoreResult<Option<ItemRecord>>;

    /// Point lookup of blob bytes. `Ok(None)` if absent.
    fn blob(&self, sum: &ContentSum) -> StoreResult<Option<Vec<u8>>>;

    /// All items owned by `owner`, ascending by id.
    fn items_by_owner(&self, owner: &AccountId) -> StoreResult<Vec<ItemRecord>>;
}

/// Persistence backend for accounts and their bearer tokens.
pub trait AccountRepository: Send + Sync {
    /// Point lookup by id. `Ok(None)` if absent.
    fn account(&self, id: &AccountId) -> StoreResult<Option<Account>>;

    /// Resolve an opaque bearer token. `Ok(None)` if unknown.
    fn account_by_token(&self, token: &str) -> StoreResult<Option<Account>>;

    /// Store a new account. Used by administration tooling and tests.
    fn insert_account(&self, account: &Account) -> StoreResult<()>;

    /// Register a bearer token for an existing account.
    fn insert_token(&self, token: &str, account: &AccountId) -> StoreResult<()>;
}

/// Tokens are stored as their SHA-256 sum so a leaked table does not leak
/// usable credentials.
pub(crate) fn token_key(token: &str) -> ContentSum {
    ContentSum::of(token.as_bytes())
}
