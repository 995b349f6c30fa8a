use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{CodecError, CodecResult};
use crate::version::FormatVersion;

/// Output buffer growth step while inflating.
const CHUNK: usize = 32 * 1024;

/// Decode an import string back into the exact original bytes.
pub fn decode(s: &str) -> CodecResult<Vec<u8>> {
    decode_inner(s, None)
}

/// Like [`decode`], but fails with [`CodecError::TooLarge`] once the
/// decompressed output would exceed `limit` bytes.
pub fn decode_limited(s: &str, limit: usize) -> CodecResult<Vec<u8>> {
    decode_inner(s, Some(limit))
}

fn decode_inner(s: &str, limit: Option<usize>) -> CodecResult<Vec<u8>> {
    let marker = s.chars().next().ok_or(CodecError::Empty)?;
    match FormatVersion::from_marker(marker)? {
        FormatVersion::V0 => {
            let payload = &s[marker.len_utf8()..];
            let compressed = STANDARD
                .decode(payload)
                .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
            inflate(&compressed, limit)
        }
    }
}

/// Inflate a complete zlib stream.
///
/// The stream must reach its end marker (and pass its Adler-32 check);
/// running out of input first is reported as truncation. Bytes after the
/// end of the stream are ignored.
fn inflate(compressed: &[u8], limit: Option<usize>) -> CodecResult<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(4).min(CHUNK));

    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        if out.len() == out.capacity() {
            out.reserve(CHUNK);
        }

        let status = inflater
            .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CodecError::Corrupt(e.to_string()))?;

        if let Some(limit) = limit {
            if out.len() > limit {
                tracing::debug!(limit, "import string exceeds size limit");
                return Err(CodecError::TooLarge { limit });
            }
        }

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let progressed = inflater.total_in() as usize != consumed
                    || inflater.total_out() != produced;
                if !progressed {
                    return Err(CodecError::Truncated);
                }
            }
        }
    }
}
