use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{SessionError, SessionResult};
use crate::session::SessionValues;

type HmacSha256 = Hmac<Sha256>;

/// Length of the key generated when none is configured.
pub const GENERATED_KEY_LEN: usize = 64;

/// Turns session values into a cookie value and back.
pub trait CookieCodec: Send + Sync {
    fn seal(&self, values: &SessionValues) -> SessionResult<String>;
    fn open(&self, raw: &str) -> SessionResult<SessionValues>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(flatten)]
    values: SessionValues,
    /// Issue time, Unix seconds.
    iat: i64,
}

/// HMAC-SHA-256 signed cookie codec with key rotation.
///
/// Wire form: `base64url(json) "." base64url(mac)` where the MAC covers
/// `name "|" base64url(json)`. New cookies are signed with the first key;
/// any listed key is accepted when opening.
pub struct SignedCookieCodec {
    name: String,
    keys: Vec<Vec<u8>>,
    max_age: Option<Duration>,
}

impl SignedCookieCodec {
    pub fn new(name: impl Into<String>, keys: Vec<Vec<u8>>, max_age: Option<Duration>) -> SessionResult<Self> {
        if keys.is_empty() {
            return Err(SessionError::InvalidKey("no keys configured".into()));
        }
        if keys.iter().any(|k| k.is_empty()) {
            return Err(SessionError::InvalidKey("empty key".into()));
        }
        Ok(Self {
            name: name.into(),
            keys,
            max_age,
        })
    }

    /// Codec with a single random key. Cookies do not survive a restart.
    pub fn with_random_key(name: impl Into<String>, max_age: Option<Duration>) -> Self {
        let mut key = vec![0u8; GENERATED_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        tracing::warn!("no session key configured; generated an ephemeral one");
        Self {
            name: name.into(),
            keys: vec![key],
            max_age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn mac(&self, key: &[u8], payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
        mac.update(self.name.as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        mac
    }

    pub(crate) fn seal_at(&self, values: &SessionValues, now: i64) -> SessionResult<String> {
        let envelope = Envelope {
            values: values.clone(),
            iat: now,
        };
        let json = serde_json::to_vec(&envelope).map_err(|e| SessionError::Encode(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = self.mac(&self.keys[0], &payload).finalize().into_bytes();
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(tag)))
    }

    pub(crate) fn open_at(&self, raw: &str, now: i64) -> SessionResult<SessionValues> {
        let (payload, tag) = raw
            .split_once('.')
            .ok_or_else(|| SessionError::Malformed("missing separator".into()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;

        let verified = self
            .keys
            .iter()
            .any(|key| self.mac(key, payload).verify_slice(&tag).is_ok());
        if !verified {
            return Err(SessionError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let envelope: Envelope =
            serde_json::from_slice(&json).map_err(|e| SessionError::Malformed(e.to_string()))?;

        if let Some(max_age) = self.max_age {
            let age = now.saturating_sub(envelope.iat);
            if age < 0 || age as u64 > max_age.as_secs() {
                return Err(SessionError::Expired);
            }
        }
        Ok(envelope.values)
    }
}

impl CookieCodec for SignedCookieCodec {
    fn seal(&self, values: &SessionValues) -> SessionResult<String> {
        self.seal_at(values, chrono::Utc::now().timestamp())
    }

    fn open(&self, raw: &str) -> SessionResult<SessionValues> {
        self.open_at(raw, chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for SignedCookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCookieCodec")
            .field("name", &self.name)
            .field("keys", &self.keys.len())
            .field("max_age", &self.max_age)
            .finish()
    }
}
