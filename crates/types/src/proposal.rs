//! Proposals and client requests.

use crate::Digest;
use sbor::prelude::BasicSbor;

/// Header of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ProposalHeader {
    /// Sequence number this proposal decides.
    pub sequence: u64,
    /// Digest of the parent the proposal extends.
    pub parent_hash: Digest,
    /// Host-supplied deterministic hash of the payload.
    pub data_hash: Digest,
}

/// A proposal circulated in PRE-PREPARE and handed to the host on commit.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Proposal {
    /// Consensus-relevant header fields.
    pub header: ProposalHeader,
    /// Opaque payload; the host interprets it.
    pub payload: Vec<u8>,
}

impl Proposal {
    /// The digest replicas vote on: the header's data hash.
    pub fn digest(&self) -> &Digest {
        &self.header.data_hash
    }

    /// The sequence number this proposal decides.
    pub fn sequence(&self) -> u64 {
        self.header.sequence
    }
}

/// A request issued by the host; becomes a proposal when the primary
/// accepts it.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Request {
    /// Opaque payload to order.
    pub payload: Vec<u8>,
}

impl Request {
    /// Create a request around an opaque payload.
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }
}
