//! Validator set membership and proposer selection.

use crate::Address;
use sbor::prelude::BasicSbor;
use std::fmt;

/// A validator's public key, as opaque bytes.
///
/// Key recovery and signature checking belong to the host; the core only
/// carries keys alongside addresses for membership lookups.
#[derive(Clone, Default, PartialEq, Eq, Hash, BasicSbor)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// One consensus participant.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Validator {
    /// The validator's address.
    pub address: Address,
    /// The validator's public key.
    pub public_key: PublicKey,
}

impl Validator {
    /// Create a validator.
    pub fn new(address: Address, public_key: PublicKey) -> Self {
        Self {
            address,
            public_key,
        }
    }

    /// The validator's address.
    pub fn address(&self) -> Address {
        self.address
    }
}

/// An ordered, finite set of `N` validators.
///
/// Validators are sorted by address on construction so every replica derives
/// the same ordering, and with it the same proposer schedule. The default
/// proposer rule is round-robin on the view number; hosts with a different
/// schedule gate proposals through `Backend::is_proposer` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Create a validator set. The input order does not matter.
    pub fn new(mut validators: Vec<Validator>) -> Self {
        validators.sort_by_key(|v| v.address);
        Self { validators }
    }

    /// Number of validators, `N`.
    pub fn size(&self) -> usize {
        self.validators.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Maximum number of Byzantine faults tolerated: `F = ⌈N/3⌉ − 1`.
    pub fn f(&self) -> u64 {
        let n = self.validators.len() as u64;
        n.div_ceil(3).saturating_sub(1)
    }

    /// Votes required for quorum: `2F + 1`.
    pub fn quorum(&self) -> u64 {
        2 * self.f() + 1
    }

    /// Validator at a given index in the deterministic ordering.
    pub fn get_by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Validator with a given address, with its index.
    pub fn get_by_address(&self, address: Address) -> Option<(usize, &Validator)> {
        self.validators
            .iter()
            .enumerate()
            .find(|(_, v)| v.address == address)
    }

    /// Whether an address belongs to the set.
    pub fn contains(&self, address: Address) -> bool {
        self.get_by_address(address).is_some()
    }

    /// The proposer for a view number: round-robin over the ordered set.
    pub fn proposer(&self, view_number: u64) -> Option<&Validator> {
        if self.validators.is_empty() {
            return None;
        }
        let index = (view_number % self.validators.len() as u64) as usize;
        self.validators.get(index)
    }

    /// Iterate validators in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }
}
