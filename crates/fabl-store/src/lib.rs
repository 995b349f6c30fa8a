//! Content-addressed item storage and account lookup for fabl.
//!
//! Blueprint bytes are stored once per distinct SHA-256 sum (a *blob*) and
//! referenced by any number of per-account *items*. Item ids embed their
//! creation time so listing by id is listing by age.
//!
//! # Layers
//!
//! - [`ContentStore`] -- dedup, owner scoping, import/export through the codec
//! - [`AccountDirectory`] -- credential checks, bearer tokens, account lookup
//! - [`ItemRepository`] / [`AccountRepository`] -- persistence seams
//!
//! # Backends
//!
//! - [`InMemoryRepository`] -- one `RwLock` over hash maps, for tests and embedding
//! - [`SqliteRepository`] -- single-file SQLite database via `rusqlite`
//!
//! # Design Rules
//!
//! 1. A blob row is never rewritten once present.
//! 2. The blob insert and the item insert commit together or not at all.
//! 3. Reads scoped to an owner never reveal another account's items.
//! 4. Credential failures are indistinguishable to the caller.

pub mod accounts;
pub mod cancel;
pub mod error;
pub mod items;
pub mod memory;
pub mod model;
pub mod password;
pub mod sqlite;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use accounts::AccountDirectory;
pub use cancel::{CancelOnDrop, Cancellation};
pub use error::{StoreError, StoreResult};
pub use items::{ContentStore, DEFAULT_MAX_BLOB_BYTES};
pub use memory::InMemoryRepository;
pub use model::{Account, CreateOutcome, Item, ItemRecord, NewItem};
pub use password::{BcryptHasher, PasswordHasher, DEFAULT_PASSWORD_COST};
pub use sqlite::SqliteRepository;
pub use traits::{AccountRepository, ItemRepository};
