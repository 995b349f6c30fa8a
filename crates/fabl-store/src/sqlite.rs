//! SQLite backend.
//!
//! Schema:
//!
//! ```text
//! blob(sum PK, data)
//! item(id PK, sum -> blob.sum, owner)
//! account(id PK, hashed_password, nickname)
//! account_token(token_sum PK, account_id -> account.id)
//! ```

use std::path::Path;
use std::sync::Mutex;

use fabl_types::{AccountId, ContentSum, ItemId};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::model::{Account, CreateOutcome, ItemRecord, NewItem};
use crate::traits::{token_key, AccountRepository, ItemRepository};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS blob (
        sum BLOB PRIMARY KEY,
        data BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS item (
        id BLOB PRIMARY KEY,
        sum BLOB NOT NULL REFERENCES blob(sum),
        owner BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS account (
        id BLOB PRIMARY KEY,
        hashed_password BLOB,
        nickname TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS account_token (
        token_sum BLOB PRIMARY KEY,
        account_id BLOB NOT NULL REFERENCES account(id)
    );

    CREATE INDEX IF NOT EXISTS idx_item_owner ON item(owner, id);
"#;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

/// SQLite-backed repository implementing both item and account storage.
///
/// Thread-safe: the connection is protected by a `Mutex`, and each item
/// insert runs in its own transaction.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "sqlite store opened");
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().expect("lock poisoned");
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM blob", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

type ItemRow = (Vec<u8>, Vec<u8>, Vec<u8>);
type AccountRow = (Vec<u8>, Option<Vec<u8>>, String);

fn item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn record_from_row(id: Vec<u8>, sum: Vec<u8>, owner: Vec<u8>) -> StoreResult<ItemRecord> {
    Ok(ItemRecord {
        id: ItemId::from_slice(&id)?,
        sum: ContentSum::from_slice(&sum)?,
        owner: AccountId::from_slice(&owner)?,
    })
}

fn account_from_row(id: Vec<u8>, hashed_password: Option<Vec<u8>>, nickname: String) -> StoreResult<Account> {
    Ok(Account {
        id: AccountId::from_slice(&id)?,
        hashed_password,
        nickname,
    })
}

impl ItemRepository for SqliteRepository {
    fn insert_item(&self, item: &NewItem<'_>) -> StoreResult<CreateOutcome> {
        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO blob (sum, data) VALUES (?1, ?2)",
            params![item.sum.as_bytes().as_slice(), item.data],
        )?;

        match tx.execute(
            "INSERT INTO item (id, sum, owner) VALUES (?1, ?2, ?3)",
            params![
                item.id.as_bytes().as_slice(),
                item.sum.as_bytes().as_slice(),
                item.owner.as_bytes().as_slice(),
            ],
        ) {
            Ok(_) => {}
            // Dropping `tx` rolls back the blob insert as well.
            Err(e) if is_constraint_violation(&e) => return Err(StoreError::Conflict(item.id)),
            Err(e) => return Err(e.into()),
        }

        if item.is_cancelled() {
            // Dropping `tx` rolls back both inserts.
            return Err(StoreError::Cancelled);
        }
        tx.commit()?;
        Ok(CreateOutcome {
            blob_existed: inserted == 0,
        })
    }

    fn item(&self, id: &ItemId) -> StoreResult<Option<ItemRecord>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, sum, owner FROM item WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                item_row,
            )
            .optional()?;
        row.map(|(id, sum, owner)| record_from_row(id, sum, owner))
            .transpose()
    }

    fn blob(&self, sum: &ContentSum) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let data = conn
            .query_row(
                "SELECT data FROM blob WHERE sum = ?1",
                params![sum.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    fn items_by_owner(&self, owner: &AccountId) -> StoreResult<Vec<ItemRecord>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn.prepare("SELECT id, sum, owner FROM item WHERE owner = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![owner.as_bytes().as_slice()], item_row)?;
        let mut records = Vec::new();
        for row in rows {
            let (id, sum, owner) = row?;
            records.push(record_from_row(id, sum, owner)?);
        }
        Ok(records)
    }
}

impl AccountRepository for SqliteRepository {
    fn account(&self, id: &AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, hashed_password, nickname FROM account WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                account_row,
            )
            .optional()?;
        row.map(|(id, hash, nickname)| account_from_row(id, hash, nickname))
            .transpose()
    }

    fn account_by_token(&self, token: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let key = token_key(token);
        let row = conn
            .query_row(
                "SELECT a.id, a.hashed_password, a.nickname
                   FROM account_token t
                   INNER JOIN account a ON a.id = t.account_id
                  WHERE t.token_sum = ?1",
                params![key.as_bytes().as_slice()],
                account_row,
            )
            .optional()?;
        row.map(|(id, hash, nickname)| account_from_row(id, hash, nickname))
            .transpose()
    }

    fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "INSERT INTO account (id, hashed_password, nickname) VALUES (?1, ?2, ?3)",
            params![
                account.id.as_bytes().as_slice(),
                account.hashed_password.as_deref(),
                account.nickname,
            ],
        )?;
        Ok(())
    }

    fn insert_token(&self, token: &str, account: &AccountId) -> StoreResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        let key = token_key(token);
        match conn.execute(
            "INSERT OR REPLACE INTO account_token (token_sum, account_id) VALUES (?1, ?2)",
            params![key.as_bytes().as_slice(), account.as_bytes().as_slice()],
        ) {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::AccountNotFound(*account)),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository").finish_non_exhaustive()
    }
}
