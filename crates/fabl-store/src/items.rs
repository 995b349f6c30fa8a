use std::sync::Arc;

use fabl_codec::CodecError;
use fabl_types::{AccountId, ContentSum, ItemId};

use crate::cancel::Cancellation;
use crate::error::{StoreError, StoreResult};
use crate::model::{Item, ItemRecord, NewItem};
use crate::traits::ItemRepository;

/// Default cap on the size of a single decoded blueprint.
pub const DEFAULT_MAX_BLOB_BYTES: usize = 16 * 1024 * 1024;

/// Deduplicating, owner-scoped item store.
///
/// Blobs are keyed by their SHA-256 sum and written at most once; items are
/// per-account references with time-sortable ids. The import string codec
/// sits at this store's boundary: [`ContentStore::import`] decodes before
/// creating, [`ContentStore::export`] encodes after reading.
pub struct ContentStore {
    repo: Arc<dyn ItemRepository>,
    max_blob_bytes: usize,
}

impl ContentStore {
    pub fn new(repo: Arc<dyn ItemRepository>) -> Self {
        Self {
            repo,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }

    /// Override the maximum accepted blob size.
    pub fn with_max_blob_bytes(mut self, max_blob_bytes: usize) -> Self {
        self.max_blob_bytes = max_blob_bytes;
        self
    }

    pub fn max_blob_bytes(&self) -> usize {
        self.max_blob_bytes
    }

    /// Store `data` for `owner` and return the new item.
    ///
    /// `timestamp_ms` of zero means "now". Fails with
    /// [`StoreError::Conflict`] if the derived id is already taken, in which
    /// case nothing is persisted.
    pub fn create(&self, owner: AccountId, data: &[u8], timestamp_ms: u64) -> StoreResult<ItemRecord> {
        self.create_inner(owner, data, timestamp_ms, None)
    }

    /// [`ContentStore::create`], abandoned with [`StoreError::Cancelled`] if
    /// `cancel` is set before the insert commits.
    pub fn create_cancellable(
        &self,
        owner: AccountId,
        data: &[u8],
        timestamp_ms: u64,
        cancel: &Cancellation,
    ) -> StoreResult<ItemRecord> {
        self.create_inner(owner, data, timestamp_ms, Some(cancel))
    }

    fn create_inner(
        &self,
        owner: AccountId,
        data: &[u8],
        timestamp_ms: u64,
        cancel: Option<&Cancellation>,
    ) -> StoreResult<ItemRecord> {
        if data.len() > self.max_blob_bytes {
            return Err(CodecError::TooLarge {
                limit: self.max_blob_bytes,
            }
            .into());
        }
        let sum = ContentSum::of(data);
        let id = ItemId::new(timestamp_ms, sum.as_bytes())?;
        let new_item = NewItem {
            id,
            owner,
            sum,
            data,
            cancel,
        };

        let outcome = self.repo.insert_item(&new_item).map_err(|e| {
            match e {
                StoreError::Conflict(_) => tracing::error!(item = %id, owner = %owner, "item id collision"),
                StoreError::Cancelled => tracing::warn!(item = %id, owner = %owner, "item insert cancelled"),
                _ => {}
            }
            e
        })?;
        tracing::info!(
            item = %id,
            owner = %owner,
            sum = %sum.short_hex(),
            deduplicated = outcome.blob_existed,
            "item created"
        );
        Ok(new_item.record())
    }

    /// Fetch an item owned by `owner`, blob bytes included.
    ///
    /// Items belonging to other accounts are reported as not found.
    pub fn get(&self, owner: &AccountId, id: &ItemId) -> StoreResult<Item> {
        let item = self.get_unscoped(id)?;
        if item.record.owner != *owner {
            return Err(StoreError::ItemNotFound(*id));
        }
        Ok(item)
    }

    /// Fetch any item regardless of owner. Not exposed to requests.
    pub fn get_unscoped(&self, id: &ItemId) -> StoreResult<Item> {
        let record = self.repo.item(id)?.ok_or(StoreError::ItemNotFound(*id))?;
        let data = self.blob_by_sum(&record.sum)?;
        Ok(Item { record, data })
    }

    pub fn blob_by_sum(&self, sum: &ContentSum) -> StoreResult<Vec<u8>> {
        self.repo.blob(sum)?.ok_or(StoreError::BlobNotFound(*sum))
    }

    /// All of `owner`'s items, oldest first.
    pub fn list(&self, owner: &AccountId) -> StoreResult<Vec<ItemRecord>> {
        self.repo.items_by_owner(owner)
    }

    /// Render an owned item as an import string.
    pub fn export(&self, owner: &AccountId, id: &ItemId) -> StoreResult<String> {
        let item = self.get(owner, id)?;
        Ok(fabl_codec::encode(&item.data)?)
    }

    /// Decode an import string and store the result for `owner`.
    pub fn import(&self, owner: AccountId, import_string: &str, timestamp_ms: u64) -> StoreResult<ItemRecord> {
        let data = fabl_codec::decode_limited(import_string, self.max_blob_bytes)?;
        self.create(owner, &data, timestamp_ms)
    }

    /// [`ContentStore::import`] that stops early once `cancel` is set.
    pub fn import_cancellable(
        &self,
        owner: AccountId,
        import_string: &str,
        timestamp_ms: u64,
        cancel: &Cancellation,
    ) -> StoreResult<ItemRecord> {
        let data = fabl_codec::decode_limited(import_string, self.max_blob_bytes)?;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.create_cancellable(owner, &data, timestamp_ms, cancel)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("max_blob_bytes", &self.max_blob_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::sqlite::SqliteRepository;

    fn store() -> (Arc<InMemoryRepository>, ContentStore) {
        let repo = Arc::new(InMemoryRepository::new());
        let store = ContentStore::new(repo.clone());
        (repo, store)
    }

    // -----------------------------------------------------------------------
    // Create / dedup
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_get() {
        let (_, store) = store();
        let owner = AccountId::random();
        let record = store.create(owner, b"blueprint", 1_000).unwrap();
        assert_eq!(record.owner, owner);
        assert_eq!(record.sum, ContentSum::of(b"blueprint"));
        assert_eq!(record.created_ms(), 1_000);

        let item = store.get(&owner, &record.id).unwrap();
        assert_eq!(item.data, b"blueprint");
        assert_eq!(item.record, record);
    }

    #[test]
    fn identical_content_shares_one_blob() {
        let (repo, store) = store();
        let alice = AccountId::random();
        let bob = AccountId::random();
        let a = store.create(alice, b"same bytes", 1_000).unwrap();
        let b = store.create(bob, b"same bytes", 2_000).unwrap();
        let c = store.create(alice, b"same bytes", 3_000).unwrap();

        assert_eq!(repo.blob_count(), 1);
        assert_eq!(repo.item_count(), 3);
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_eq!(a.sum, b.sum);
        assert_eq!(store.blob_by_sum(&a.sum).unwrap(), b"same bytes");
    }

    #[test]
    fn same_content_same_millisecond_conflicts() {
        let (repo, store) = store();
        let alice = AccountId::random();
        let bob = AccountId::random();
        let first = store.create(alice, b"dup", 5_000).unwrap();
        let err = store.create(bob, b"dup", 5_000).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == first.id));

        // The first item is untouched and still owned by alice.
        assert_eq!(repo.item_count(), 1);
        assert_eq!(store.get(&alice, &first.id).unwrap().record.owner, alice);
    }

    #[test]
    fn zero_timestamp_means_now() {
        let (_, store) = store();
        let record = store.create(AccountId::random(), b"now", 0).unwrap();
        assert!(record.created_ms() > 1_600_000_000_000);
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let repo = Arc::new(InMemoryRepository::new());
        let store = ContentStore::new(repo.clone()).with_max_blob_bytes(4);
        let err = store.create(AccountId::random(), b"too long", 1).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(repo.item_count(), 0);
    }

    #[test]
    fn overflowing_timestamp_is_a_client_error() {
        let (_, store) = store();
        let err = store.create(AccountId::random(), b"x", u64::MAX).unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
        assert!(err.is_client_error());
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn get_is_owner_scoped() {
        let (_, store) = store();
        let alice = AccountId::random();
        let record = store.create(alice, b"private", 1).unwrap();
        let err = store.get(&AccountId::random(), &record.id).unwrap_err();
        assert!(matches!(err, StoreError::ItemNotFound(_)));
        assert!(store.get_unscoped(&record.id).is_ok());
    }

    #[test]
    fn missing_item_and_blob() {
        let (_, store) = store();
        let id = ItemId::from_bytes([9; 16]);
        assert!(matches!(store.get(&AccountId::random(), &id), Err(StoreError::ItemNotFound(_))));
        let sum = ContentSum::of(b"never stored");
        assert!(matches!(store.blob_by_sum(&sum), Err(StoreError::BlobNotFound(s)) if s == sum));
    }

    #[test]
    fn list_is_chronological() {
        let (_, store) = store();
        let owner = AccountId::random();
        for (ts, data) in [(3_000u64, &b"c"[..]), (1_000, b"a"), (2_000, b"b")] {
            store.create(owner, data, ts).unwrap();
        }
        store.create(AccountId::random(), b"someone else", 1_500).unwrap();

        let listed = store.list(&owner).unwrap();
        assert_eq!(listed.len(), 3);
        for pair in listed.windows(2) {
            assert!(pair[0].id <= pair[1].id);
            assert!(pair[0].created_ms() <= pair[1].created_ms());
        }
        // Re-querying gives the same snapshot.
        assert_eq!(store.list(&owner).unwrap(), listed);
    }

    // -----------------------------------------------------------------------
    // Import / export
    // -----------------------------------------------------------------------

    #[test]
    fn import_then_export_roundtrips() {
        let (_, store) = store();
        let owner = AccountId::random();
        let import = fabl_codec::encode(b"Hello, blueprint!").unwrap();
        let record = store.import(owner, &import, 42).unwrap();
        assert_eq!(store.get(&owner, &record.id).unwrap().data, b"Hello, blueprint!");
        assert_eq!(store.export(&owner, &record.id).unwrap(), import);
    }

    #[test]
    fn failed_import_leaves_no_state() {
        let (repo, store) = store();
        let owner = AccountId::random();
        for bad in ["", "9abc", "0not-base64!", "0"] {
            let err = store.import(owner, bad, 1).unwrap_err();
            assert!(matches!(err, StoreError::Format(_)), "{bad:?}: {err}");
            assert!(err.is_client_error());
        }
        assert_eq!(repo.item_count(), 0);
        assert_eq!(repo.blob_count(), 0);
    }

    #[test]
    fn export_of_foreign_item_is_not_found() {
        let (_, store) = store();
        let record = store.create(AccountId::random(), b"mine", 1).unwrap();
        assert!(matches!(
            store.export(&AccountId::random(), &record.id),
            Err(StoreError::ItemNotFound(_))
        ));
    }

    #[test]
    fn cancelled_import_stores_nothing() {
        let (repo, store) = store();
        let owner = AccountId::random();
        let import = fabl_codec::encode(b"abandoned").unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();

        let err = store.import_cancellable(owner, &import, 7, &cancel).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert!(!err.is_client_error());
        assert_eq!(repo.item_count(), 0);
        assert_eq!(repo.blob_count(), 0);

        // A live flag does not get in the way.
        let record = store.import_cancellable(owner, &import, 7, &Cancellation::new()).unwrap();
        assert_eq!(store.list(&owner).unwrap(), vec![record]);
    }

    #[test]
    fn cancelled_create_rolls_back_sqlite() {
        let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
        let store = ContentStore::new(repo.clone());
        let owner = AccountId::random();
        let cancel = Cancellation::new();
        cancel.cancel();

        let err = store.create_cancellable(owner, b"never lands", 3, &cancel).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert_eq!(repo.blob_count().unwrap(), 0);
        assert!(store.list(&owner).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_identical_imports_store_one_blob() {
        use std::thread;

        let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
        let store = Arc::new(ContentStore::new(repo.clone()));
        let owner = AccountId::random();

        let handles: Vec<_> = (1..=16u64)
            .map(|ts| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.create(owner, b"contended", ts).unwrap())
            })
            .collect();
        let mut ids: Vec<ItemId> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic").id)
            .collect();

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(repo.blob_count().unwrap(), 1);
        assert_eq!(store.list(&owner).unwrap().len(), 16);
    }
}
