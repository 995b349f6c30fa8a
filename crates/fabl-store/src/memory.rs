use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use fabl_types::{AccountId, ContentSum, ItemId};

use crate::error::{StoreError, StoreResult};
use crate::model::{Account, CreateOutcome, ItemRecord, NewItem};
use crate::traits::{token_key, AccountRepository, ItemRepository};

#[derive(Default)]
struct Tables {
    blobs: HashMap<ContentSum, Vec<u8>>,
    items: BTreeMap<ItemId, ItemRecord>,
    accounts: HashMap<AccountId, Account>,
    tokens: HashMap<ContentSum, AccountId>,
}

/// In-memory backend implementing both repositories.
///
/// Intended for tests and embedding. Every table sits behind one `RwLock`,
/// so an item insert (blob + item row) is a single critical section.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").blobs.len()
    }

    /// Number of item rows stored.
    pub fn item_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").items.len()
    }
}

impl ItemRepository for InMemoryRepository {
    fn insert_item(&self, item: &NewItem<'_>) -> StoreResult<CreateOutcome> {
        let mut tables = self.tables.write().expect("lock poisoned");
        // Check before touching the blob table so a conflict leaves no trace.
        if tables.items.contains_key(&item.id) {
            return Err(StoreError::Conflict(item.id));
        }
        if item.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let blob_existed = tables.blobs.contains_key(&item.sum);
        if !blob_existed {
            tables.blobs.insert(item.sum, item.data.to_vec());
        }
        tables.items.insert(item.id, item.record());
        Ok(CreateOutcome { blob_existed })
    }

    fn item(&self, id: &ItemId) -> StoreResult<Option<ItemRecord>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.items.get(id).cloned())
    }

    fn blob(&self, sum: &ContentSum) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.blobs.get(sum).cloned())
    }

    fn items_by_owner(&self, owner: &AccountId) -> StoreResult<Vec<ItemRecord>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .items
            .values()
            .filter(|record| record.owner == *owner)
            .cloned()
            .collect())
    }
}

impl AccountRepository for InMemoryRepository {
    fn account(&self, id: &AccountId) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.accounts.get(id).cloned())
    }

    fn account_by_token(&self, token: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .tokens
            .get(&token_key(token))
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::Persistence(format!(
                "account {} already exists",
                account.id
            )));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn insert_token(&self, token: &str, account: &AccountId) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        if !tables.accounts.contains_key(account) {
            return Err(StoreError::AccountNotFound(*account));
        }
        tables.tokens.insert(token_key(token), *account);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("blob_count", &self.blob_count())
            .field("item_count", &self.item_count())
            .finish()
    }
}
