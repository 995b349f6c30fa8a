use crate::error::{StoreError, StoreResult};

/// Work factor used when none is configured.
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// Password hashing primitive used by the account directory.
pub trait PasswordHasher: Send + Sync {
    /// Produce a salted hash for storage.
    fn hash(&self, password: &str) -> StoreResult<Vec<u8>>;

    /// Check a candidate against a stored hash. Must run in time
    /// independent of where the candidate first differs. A malformed hash
    /// never verifies.
    fn verify(&self, hash: &[u8], candidate: &str) -> bool;
}

/// bcrypt hasher.
///
/// Stored form is the modular-crypt string (`$2b$<cost>$<salt+hash>`) as
/// bytes. Verification reads the cost from the stored hash, so accounts
/// hashed at an older cost keep working after the configured cost changes.
#[derive(Clone, Copy, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> StoreResult<Vec<u8>> {
        bcrypt::hash(password, self.cost)
            .map(String::into_bytes)
            .map_err(|e| StoreError::PasswordHash(e.to_string()))
    }

    fn verify(&self, hash: &[u8], candidate: &str) -> bool {
        let Ok(hash) = std::str::from_utf8(hash) else {
            return false;
        };
        bcrypt::verify(candidate, hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[test]
    fn hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(hash.starts_with(b"$2b$04$"));
        assert!(hasher.verify(&hash, "hunter2"));
        assert!(!hasher.verify(&hash, "hunter3"));
        assert!(!hasher.verify(&hash, ""));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn verifies_2a_hashes() {
        // Other bcrypt implementations write the `$2a$` prefix.
        let hash = hasher().hash("hunter2").unwrap();
        let legacy = String::from_utf8(hash).unwrap().replacen("$2b$", "$2a$", 1);
        assert!(hasher().verify(legacy.as_bytes(), "hunter2"));
    }

    #[test]
    fn cost_comes_from_the_stored_hash() {
        let hash = BcryptHasher::new(5).hash("pw").unwrap();
        assert!(hasher().verify(&hash, "pw"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = hasher();
        assert!(!hasher.verify(&[], "x"));
        assert!(!hasher.verify(&[0u8; 47], "x"));
        assert!(!hasher.verify(&[0xff, 0xfe], "x"));
        assert!(!hasher.verify(b"$2b$04$short", "x"));
    }

    #[test]
    fn out_of_range_cost_is_an_error() {
        assert!(matches!(
            BcryptHasher::new(99).hash("pw"),
            Err(StoreError::PasswordHash(_))
        ));
    }
}
