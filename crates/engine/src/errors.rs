//! Error types for the consensus core.

use pbft_messages::CodecError;
use thiserror::Error;

/// Errors produced while processing a single event.
///
/// None of these are fatal: each is local to one message and the state
/// machine remains live after all of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// The message's view is ahead of the local view; it was deferred to
    /// the backlog.
    #[error("message is ahead of the local view")]
    FutureMessage,

    /// The message's view is behind the local view.
    #[error("message is behind the local view")]
    OldMessage,

    /// A PREPARE/COMMIT subject did not structurally match the local
    /// subject. Evidence of equivocation or truncation.
    #[error("subject does not match the local subject")]
    SubjectNotMatched,

    /// The sender is not a member of the current validator set.
    #[error("sender is not in the validator set")]
    UnauthorizedSender,

    /// A PRE-PREPARE arrived from a replica that is not the current
    /// proposer.
    #[error("pre-prepare from a replica that is not the proposer")]
    UnauthorizedProposer,

    /// A PRE-PREPARE proposal does not extend the local sequence.
    #[error("proposal does not extend the local sequence")]
    InvalidProposal,

    /// The message body could not be decoded.
    #[error(transparent)]
    Decode(#[from] CodecError),

    /// The host rejected the committed proposal. The core stays parked in
    /// `Committed` and awaits a view change.
    #[error("host rejected the committed proposal: {0}")]
    HostCommitRejected(String),

    /// The sender's backlog is at capacity; the newest message was dropped.
    #[error("backlog for peer is full")]
    BacklogOverflow,
}
