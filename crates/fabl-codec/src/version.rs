use std::fmt;

use crate::error::CodecError;

/// Format of an import string, named by its leading marker character.
///
/// Only `V0` exists today. Any other leading character is rejected so the
/// namespace stays free for future formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatVersion {
    /// `'0'`: zlib stream at best compression, standard padded base64.
    V0,
}

impl FormatVersion {
    /// The version new strings are written with.
    pub const CURRENT: Self = Self::V0;

    pub const fn marker(self) -> char {
        match self {
            Self::V0 => '0',
        }
    }

    pub fn from_marker(c: char) -> Result<Self, CodecError> {
        match c {
            '0' => Ok(Self::V0),
            other => Err(CodecError::UnknownVersion(other)),
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.marker())
    }
}
