//! BLAKE3 digests for plan identity and audit chaining.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 hash (256 bits / 32 bytes), serialized as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash([u8; 32]);

impl Hash {
    /// The number of bytes in a hash
    pub const LEN: usize = 32;

    /// Compute BLAKE3 hash of data
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash a sequence of string parts, length-prefixed so that
    /// `["ab", "c"]` and `["a", "bc"]` differ
    #[must_use]
    pub fn compute_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// The all-zero hash, used as the genesis link of a chain
    #[must_use]
    pub const fn empty() -> Self {
        Self([0u8; 32])
    }

    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First `len` hex characters, for human-facing identifiers
    #[must_use]
    pub fn short_hex(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len.min(Self::LEN * 2));
        hex
    }

    /// Parse from hex string
    ///
    /// # Errors
    ///
    /// Returns error if hex is invalid or not 32 bytes
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(hex).map_err(|_| HashError::InvalidHex)?;
        if bytes.len() != Self::LEN {
            return Err(HashError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Hash {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.to_hex()
    }
}

/// Hash-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Invalid hex encoding
    InvalidHex,
    /// Invalid length (not 32 bytes)
    InvalidLength(usize),
}

impl std::error::Error for HashError {}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "Invalid hex encoding"),
            Self::InvalidLength(len) => write!(f, "Invalid hash length: {} (expected 32)", len),
        }
    }
}
