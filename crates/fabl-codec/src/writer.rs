use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{CodecError, CodecResult};
use crate::version::FormatVersion;

/// Encode raw bytes as a current-format import string.
///
/// The compression level is fixed at best, so the same input always yields
/// the same string.
pub fn encode(data: &[u8]) -> CodecResult<String> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| CodecError::Compress(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CodecError::Compress(e.to_string()))?;

    let marker = FormatVersion::CURRENT.marker();
    let mut out = String::with_capacity(1 + compressed.len().div_ceil(3) * 4);
    out.push(marker);
    STANDARD.encode_string(&compressed, &mut out);
    Ok(out)
}
