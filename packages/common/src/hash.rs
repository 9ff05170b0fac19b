//! Deterministic string → identifier mapping.
//!
//! Identifiers key property metadata, connector metadata and node types.
//! They are derived from human-readable titles with CRC32, so the same title
//! always yields the same identifier across runs and machines. Not cryptographic.

use std::fmt;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Opaque, totally ordered identifier derived from a string key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(u32);

impl Identifier {
    /// Derive the identifier for a title
    pub fn from_title(title: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(title.as_bytes());
        Self(hasher.finalize())
    }

    /// Wrap a raw value (for identifiers restored from storage)
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Shorthand for [`Identifier::from_title`]
pub fn hash(title: &str) -> Identifier {
    Identifier::from_title(title)
}

impl From<&str> for Identifier {
    fn from(title: &str) -> Self {
        Identifier::from_title(title)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
