//! Proposal digests.

use sbor::prelude::BasicSbor;
use std::fmt;

/// A host-computed digest of a proposal payload.
///
/// The core never hashes anything itself; digests come from the host's hash
/// function and are treated as opaque byte strings. Length is host-defined.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Create a digest from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Create a digest by copying a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the digest is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Digest {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Digest {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}
