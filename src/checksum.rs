//! Checksums for generated artifacts
//!
//! Compilation must be reproducible: the same registry and configuration
//! always produce byte-identical output. Checksums make that cheap to assert.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of generated content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn of_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Combine named checksums into one, independent of input order
    pub fn combine<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Checksum)>,
    {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        for (name, checksum) in entries {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(checksum.0.as_bytes());
            hasher.update(b"\n");
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        *self == Self::of_str(content)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = "class Person(BaseModel):\n    pass\n";
        assert_eq!(Checksum::of_str(content), Checksum::of_str(content));
    }

    #[test]
    fn test_checksum_verification() {
        let content = "from enum import Enum\n";
        let checksum = Checksum::of_str(content);
        assert!(checksum.verify(content));
        assert!(!checksum.verify("different content"));
    }

    #[test]
    fn test_combine_is_order_independent() {
        let a = Checksum::of_str("a");
        let b = Checksum::of_str("b");
        let forward = Checksum::combine([("A", &a), ("B", &b)]);
        let backward = Checksum::combine([("B", &b), ("A", &a)]);
        assert_eq!(forward, backward);
        assert_ne!(forward, Checksum::combine([("A", &b), ("B", &a)]));
    }
}
