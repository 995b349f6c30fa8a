use std::sync::Arc;

use fabl_types::AccountId;

use crate::error::{StoreError, StoreResult};
use crate::model::Account;
use crate::password::PasswordHasher;
use crate::traits::AccountRepository;

/// Account lookup and credential verification.
///
/// Every credential failure is reported as the same
/// [`StoreError::Authentication`], whether the account is unknown, has no
/// password, or the password is wrong.
pub struct AccountDirectory {
    repo: Arc<dyn AccountRepository>,
    hasher: Arc<dyn PasswordHasher>,
    /// Verified against when the account is unknown or has no password, so
    /// those failures cost the same as a wrong password.
    decoy_hash: Vec<u8>,
}

impl AccountDirectory {
    pub fn new(repo: Arc<dyn AccountRepository>, hasher: Arc<dyn PasswordHasher>) -> StoreResult<Self> {
        let decoy_hash = hasher.hash("decoy password")?;
        Ok(Self {
            repo,
            hasher,
            decoy_hash,
        })
    }

    /// Look up an account by id.
    pub fn get(&self, id: &AccountId) -> StoreResult<Account> {
        self.repo
            .account(id)?
            .ok_or(StoreError::AccountNotFound(*id))
    }

    /// Check `candidate` against the account's stored hash.
    pub fn verify_credentials(&self, id: &AccountId, candidate: &str) -> StoreResult<Account> {
        let account = match self.repo.account(id) {
            Ok(Some(account)) => account,
            Ok(None) => {
                let _ = self.hasher.verify(&self.decoy_hash, candidate);
                return Err(StoreError::Authentication);
            }
            Err(e) => {
                tracing::warn!(account = %id, error = %e, "account lookup failed during login");
                let _ = self.hasher.verify(&self.decoy_hash, candidate);
                return Err(StoreError::Authentication);
            }
        };

        let Some(hash) = account.hashed_password.as_deref() else {
            let _ = self.hasher.verify(&self.decoy_hash, candidate);
            return Err(StoreError::Authentication);
        };
        if candidate.is_empty() || !self.hasher.verify(hash, candidate) {
            return Err(StoreError::Authentication);
        }
        Ok(account)
    }

    /// Resolve a bearer token to its account.
    pub fn from_token(&self, token: &str) -> StoreResult<Account> {
        if token.is_empty() {
            return Err(StoreError::Authentication);
        }
        self.repo
            .account_by_token(token)?
            .ok_or(StoreError::Authentication)
    }

    /// Create an account with a freshly hashed password.
    ///
    /// Not part of any request path; used by administration tooling.
    pub fn create_account(&self, nickname: &str, password: Option<&str>) -> StoreResult<Account> {
        let account = Account {
            id: AccountId::random(),
            hashed_password: password.map(|p| self.hasher.hash(p)).transpose()?,
            nickname: nickname.to_string(),
        };
        self.repo.insert_account(&account)?;
        tracing::info!(account = %account.id, nickname, "account created");
        Ok(account)
    }

    /// Register a bearer token for an account.
    pub fn issue_token(&self, token: &str, id: &AccountId) -> StoreResult<()> {
        self.repo.insert_token(token, id)
    }
}
