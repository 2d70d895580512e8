//! Validator addresses.

use sbor::prelude::BasicSbor;
use std::fmt;
use thiserror::Error;

/// Number of bytes in an address.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors from address parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Input was not exactly [`ADDRESS_LENGTH`] bytes.
    #[error("invalid address length: expected {ADDRESS_LENGTH}, got {0}")]
    InvalidLength(usize),

    /// Input contained a non-hex character.
    #[error("invalid hex character in address")]
    InvalidHex,
}

/// A validator address: the fixed-size identity a replica is known by.
///
/// Addresses are `Ord` so that address-keyed maps iterate in a deterministic
/// order across replicas (backlog drain fairness depends on this).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create an address from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parse an address from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength(s.len() / 2));
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_nibble(s.as_bytes()[2 * i])?;
            let lo = hex_nibble(s.as_bytes()[2 * i + 1])?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

fn hex_nibble(c: u8) -> Result<u8, AddressError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(AddressError::InvalidHex),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}
