//! In-memory host backend.

use crate::network::SimNetwork;
use parking_lot::Mutex;
use pbft_engine::{Backend, BackendError, EventMux};
use pbft_types::{Address, Digest, Proposal, ValidatorSet};

/// A host backend whose chain is a `Vec<Proposal>`.
///
/// The proposer schedule is static (view number 0's round-robin slot);
/// view changes are outside the engine's scope, so the schedule never
/// rotates.
pub struct SimBackend {
    address: Address,
    validators: ValidatorSet,
    mux: EventMux,
    network: SimNetwork,
    chain: Mutex<Vec<Proposal>>,
}

impl SimBackend {
    /// Create a backend for one replica.
    pub fn new(address: Address, validators: ValidatorSet, network: SimNetwork) -> Self {
        Self {
            address,
            validators,
            mux: EventMux::new(),
            network,
            chain: Mutex::new(vec![]),
        }
    }

    /// Copy of the committed chain.
    pub fn chain(&self) -> Vec<Proposal> {
        self.chain.lock().clone()
    }

    /// Committed chain length.
    pub fn chain_len(&self) -> usize {
        self.chain.lock().len()
    }
}

impl Backend for SimBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn validators(&self) -> ValidatorSet {
        self.validators.clone()
    }

    fn is_proposer(&self) -> bool {
        self.validators.proposer(0).map(|v| v.address) == Some(self.address)
    }

    fn hash(&self, data: &[u8]) -> Digest {
        Digest::from_slice(blake3::hash(data).as_bytes())
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        // address-tagged stand-in; real hosts sign with an identity key
        let mut signature = self.address.as_bytes().to_vec();
        signature.extend_from_slice(&blake3::hash(data).as_bytes()[..8]);
        signature
    }

    fn send(&self, payload: Vec<u8>) {
        self.network.broadcast(self.address, payload);
    }

    fn commit(&self, proposal: Proposal) -> Result<(), BackendError> {
        let mut chain = self.chain.lock();
        if let Some(last) = chain.last() {
            if proposal.sequence() != last.sequence() + 1 {
                return Err(BackendError::CommitRejected(format!(
                    "expected sequence {}, got {}",
                    last.sequence() + 1,
                    proposal.sequence()
                )));
            }
        }
        chain.push(proposal);
        Ok(())
    }

    fn event_mux(&self) -> EventMux {
        self.mux.clone()
    }
}
