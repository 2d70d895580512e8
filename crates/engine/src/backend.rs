//! The capability surface the core consumes from its host.

use crate::events::EventMux;
use pbft_types::{Address, Digest, Proposal, ValidatorSet};
use thiserror::Error;

/// Errors surfaced by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The host refused the committed proposal (e.g. chain insertion
    /// failed).
    #[error("commit rejected: {0}")]
    CommitRejected(String),
}

/// Host capabilities.
///
/// The core owns no transport, storage, or cryptography; everything it
/// needs from the surrounding node comes through this trait. `send` is
/// best-effort and must not block for long; neither `send` nor `commit` may
/// re-enter the event loop synchronously.
pub trait Backend: Send + Sync + 'static {
    /// This replica's own address.
    fn address(&self) -> Address;

    /// The current validator set.
    fn validators(&self) -> ValidatorSet;

    /// Whether this replica is the proposer for the host's current view.
    fn is_proposer(&self) -> bool;

    /// Deterministic hash of arbitrary bytes.
    fn hash(&self, data: &[u8]) -> Digest;

    /// Sign arbitrary bytes with this replica's identity key.
    fn sign(&self, data: &[u8]) -> Vec<u8>;

    /// Broadcast a framed payload to all peers. Best effort.
    fn send(&self, payload: Vec<u8>);

    /// Durably hand off a decided proposal. May reject.
    fn commit(&self, proposal: Proposal) -> Result<(), BackendError>;

    /// The event mux the engine subscribes to and the host publishes on.
    fn event_mux(&self) -> EventMux;
}
