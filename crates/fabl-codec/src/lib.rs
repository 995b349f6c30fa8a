//! Import string codec for fabl.
//!
//! An import string is the text-safe form of a blueprint payload:
//!
//! ```text
//! "0" + base64(zlib(raw_bytes, level = best))
//! ```
//!
//! The leading character names the [`FormatVersion`]. Compression is
//! mandatory and uses a fixed level, so [`encode`] is deterministic.
//! [`decode`] rejects empty strings, unknown markers, bad base64, and
//! truncated or corrupt zlib streams, all as format errors the caller can
//! fix by correcting its input.

pub mod error;
pub mod reader;
pub mod version;
pub mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::{decode, decode_limited};
pub use version::FormatVersion;
pub use writer::encode;
