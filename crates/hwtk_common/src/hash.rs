//! Content hashing used to recognize structurally identical artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit XXH3 digest of some rendered artifact.
///
/// Two component declarations with the same `ContentHash` render to the same
/// text and are declared only once in a parent architecture.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(u128);

impl ContentHash {
    /// Hashes a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data))
    }

    /// Hashes the `Display` rendering of a value.
    pub fn of_display(value: &impl fmt::Display) -> Self {
        Self::from_bytes(value.to_string().as_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:08x}..)", (self.0 >> 96) as u32)
    }
}
