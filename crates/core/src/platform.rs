//! Platform tags used in bundle names.

use std::fmt;

use crate::{Error, Result};

/// Pointer width of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    /// 32-bit process
    Bits32,
    /// 64-bit process
    Bits64,
}

impl WordSize {
    /// Word size of the running process.
    #[must_use]
    pub const fn current() -> Self {
        Self::from_pointer_bits(usize::BITS)
    }

    /// Word size for a pointer width in bits; anything but 32 is 64-bit.
    #[must_use]
    pub const fn from_pointer_bits(bits: u32) -> Self {
        if bits == 32 { Self::Bits32 } else { Self::Bits64 }
    }

    /// Tag used in Windows bundle names.
    #[must_use]
    pub const fn windows_tag(self) -> &'static str {
        match self {
            Self::Bits32 => "x86",
            Self::Bits64 => "x64",
        }
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => write!(f, "32-bit"),
            Self::Bits64 => write!(f, "64-bit"),
        }
    }
}

impl std::str::FromStr for WordSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "32" | "x86" | "i686" => Ok(Self::Bits32),
            "64" | "x64" | "x86_64" | "amd64" => Ok(Self::Bits64),
            _ => Err(Error::InvalidPlatform { tag: s.to_string() }),
        }
    }
}

/// Reject tags that would escape a URL segment or a directory name.
///
/// # Errors
///
/// Returns [`Error::InvalidPlatform`] for empty tags, tags with path
/// separators or whitespace, and `.`/`..`.
pub fn validate_platform_tag(tag: &str) -> Result<&str> {
    let invalid = tag.is_empty()
        || tag == "."
        || tag == ".."
        || tag
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c == '?' || c == '#');

    if invalid {
        Err(Error::InvalidPlatform {
            tag: tag.to_string(),
        })
    } else {
        Ok(tag)
    }
}
