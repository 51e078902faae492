//! Hash Fields - Abbreviated Commit Hashes as 32-bit Words
//!
//! Every hash constant in the package is exactly 8 hex characters.
//! Shorter abbreviations are zero-filled on the left, longer ones are cut
//! to their first 8 characters, and an unresolvable revision becomes the
//! all-zero sentinel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub const FIELD_WIDTH: usize = 8;
pub const UNKNOWN_FIELD: &str = "00000000";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashField(String);

impl HashField {
    /// Normalize an abbreviated hash. Returns `None` when the input is
    /// empty or not hexadecimal.
    pub fn from_abbrev(abbrev: &str) -> Option<Self> {
        let abbrev = abbrev.trim();
        if abbrev.is_empty() || !abbrev.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let abbrev = abbrev.to_ascii_lowercase();
        let cut = &abbrev[..abbrev.len().min(FIELD_WIDTH)];
        Some(Self(format!("{:0>width$}", cut, width = FIELD_WIDTH)))
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_FIELD.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_FIELD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_u32(&self) -> u32 {
        // Always 8 hex digits by construction.
        u32::from_str_radix(&self.0, 16).unwrap_or(0)
    }
}

impl std::fmt::Display for HashField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for HashField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HashField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_abbrev(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("not a hex hash: {raw:?}")))
    }
}

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
