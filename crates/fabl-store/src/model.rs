use fabl_types::{AccountId, ContentSum, ItemId};

use crate::cancel::Cancellation;

/// One row of the item table: an account's reference to a blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub owner: AccountId,
    pub sum: ContentSum,
}

impl ItemRecord {
    /// Creation time, recovered from the id.
    pub fn created_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }
}

/// An item together with its blob bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub record: ItemRecord,
    pub data: Vec<u8>,
}

/// Everything a backend needs to persist a new item in one transaction.
#[derive(Clone, Copy, Debug)]
pub struct NewItem<'a> {
    pub id: ItemId,
    pub owner: AccountId,
    pub sum: ContentSum,
    pub data: &'a [u8],
    /// Checked before commit; a set flag rolls the insert back.
    pub cancel: Option<&'a Cancellation>,
}

impl NewItem<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(Cancellation::is_cancelled)
    }

    pub fn record(&self) -> ItemRecord {
        ItemRecord {
            id: self.id,
            owner: self.owner,
            sum: self.sum,
        }
    }
}

/// What a successful insert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateOutcome {
    /// The blob row was already present and was left untouched.
    pub blob_existed: bool,
}

/// A stored account. Created outside the core; read here.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub hashed_password: Option<Vec<u8>>,
    pub nickname: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("nickname", &self.nickname)
            .field("has_password", &self.hashed_password.is_some())
            .finish()
    }
}
