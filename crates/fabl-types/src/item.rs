use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of the canonical string form.
pub const ENCODED_LEN: usize = 26;

/// Largest timestamp representable in the 48-bit time prefix.
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

const TAIL_DOMAIN: &[u8] = b"fabl-item-id-v1:";

/// Time-sortable 128-bit item identifier.
///
/// Layout (big-endian):
///
/// ```text
/// | 48 bits: unix time in ms | 80 bits: expansion of the seed |
/// ```
///
/// Byte-lexicographic order therefore equals `(timestamp_ms, tail)` order.
/// The tail is a deterministic function of the seed (the item's content
/// sum), so importing identical content twice in the same millisecond
/// yields the same id. Stores must enforce uniqueness on insert.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId([u8; 16]);

impl ItemId {
    /// Build an id from a timestamp and a seed.
    ///
    /// A zero `timestamp_ms` is replaced with the current wall-clock time.
    pub fn new(timestamp_ms: u64, seed: &[u8]) -> Result<Self, TypeError> {
        let timestamp_ms = if timestamp_ms == 0 { now_ms() } else { timestamp_ms };
        if timestamp_ms > MAX_TIMESTAMP_MS {
            return Err(TypeError::TimestampOverflow(timestamp_ms));
        }

        let mut bytes = [0u8; 16];
        bytes[..6].copy_from_slice(&timestamp_ms.to_be_bytes()[2..]);

        let mut hasher = blake3::Hasher::new();
        hasher.update(TAIL_DOMAIN);
        hasher.update(seed);
        hasher.finalize_xof().fill(&mut bytes[6..]);

        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Milliseconds since the UNIX epoch embedded in the id.
    pub fn timestamp_ms(&self) -> u64 {
        let mut ts = [0u8; 8];
        ts[2..].copy_from_slice(&self.0[..6]);
        u64::from_be_bytes(ts)
    }

    /// Canonical 26-character Crockford base32 form.
    pub fn encode(&self) -> String {
        let value = u128::from_be_bytes(self.0);
        (0..ENCODED_LEN)
            .map(|i| {
                let shift = 125 - 5 * i;
                ALPHABET[((value >> shift) & 0x1f) as usize] as char
            })
            .collect()
    }

    /// Parse the canonical form. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != ENCODED_LEN {
            return Err(TypeError::InvalidItemId(format!(
                "expected {ENCODED_LEN} characters, got {}",
                s.len()
            )));
        }
        let mut value: u128 = 0;
        for (i, c) in s.bytes().enumerate() {
            let digit = decode_digit(c).ok_or_else(|| {
                TypeError::InvalidItemId(format!("invalid character {:?} at {i}", c as char))
            })?;
            // The first character only carries the top 3 of 128 bits.
            if i == 0 && digit > 7 {
                return Err(TypeError::InvalidItemId("value overflows 128 bits".into()));
            }
            value = (value << 5) | u128::from(digit);
        }
        Ok(Self(value.to_be_bytes()))
    }
}

fn decode_digit(c: u8) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    ALPHABET.iter().position(|&a| a == upper).map(|p| p as u8)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.encode())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ItemId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
