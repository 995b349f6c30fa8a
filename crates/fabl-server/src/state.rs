use std::sync::Arc;

use fabl_store::{
    AccountDirectory, AccountRepository, BcryptHasher, ContentStore, InMemoryRepository, ItemRepository,
    SqliteRepository,
};

use crate::config::{DatabaseConfig, ServerConfig};
use crate::error::ServerResult;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    items: Arc<ContentStore>,
    accounts: Arc<AccountDirectory>,
}

impl AppState {
    pub fn new(items: ContentStore, accounts: AccountDirectory) -> Self {
        Self {
            items: Arc::new(items),
            accounts: Arc::new(accounts),
        }
    }

    /// Open the configured database and wire the services on top of it.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let (items, accounts): (Arc<dyn ItemRepository>, Arc<dyn AccountRepository>) = match &config.database {
            DatabaseConfig::Memory => {
                tracing::warn!("using in-memory database; data is lost on exit");
                let repo = Arc::new(InMemoryRepository::new());
                (repo.clone() as Arc<dyn ItemRepository>, repo as Arc<dyn AccountRepository>)
            }
            DatabaseConfig::Sqlite { path } => {
                let repo = Arc::new(SqliteRepository::open(path)?);
                (repo.clone() as Arc<dyn ItemRepository>, repo as Arc<dyn AccountRepository>)
            }
        };
        Ok(Self::new(
            ContentStore::new(items).with_max_blob_bytes(config.max_blueprint_bytes),
            AccountDirectory::new(accounts, Arc::new(BcryptHasher::new(config.password_cost)))?,
        ))
    }

    pub fn items(&self) -> &Arc<ContentStore> {
        &self.items
    }

    pub fn accounts(&self) -> &Arc<AccountDirectory> {
        &self.accounts
    }
}
