//! Typed consensus message bodies.

use pbft_types::{Proposal, Subject, View};
use sbor::prelude::BasicSbor;

/// Message kind discriminator.
///
/// The declaration order doubles as the backlog replay rank: a deferred
/// PRE-PREPARE for a view replays before the PREPAREs and COMMITs queued
/// behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub enum MsgCode {
    /// Primary's proposal announcement.
    PrePrepare,
    /// First-phase vote over a subject.
    Prepare,
    /// Second-phase vote over a subject.
    Commit,
}

impl MsgCode {
    /// Numeric code used in the signing input.
    pub fn as_u8(&self) -> u8 {
        match self {
            MsgCode::PrePrepare => 0,
            MsgCode::Prepare => 1,
            MsgCode::Commit => 2,
        }
    }

    /// Replay rank within the backlog: PRE-PREPARE < PREPARE < COMMIT.
    pub fn rank(&self) -> u8 {
        self.as_u8()
    }
}

/// Body of a PRE-PREPARE message.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct PrePrepare {
    /// The view this proposal is announced for.
    pub view: View,
    /// The proposal itself.
    pub proposal: Proposal,
}

impl PrePrepare {
    /// Create a new PRE-PREPARE body.
    pub fn new(view: View, proposal: Proposal) -> Self {
        Self { view, proposal }
    }
}

/// A decoded consensus message: one variant per [`MsgCode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusMessage {
    /// Primary's proposal announcement.
    PrePrepare(PrePrepare),
    /// First-phase vote.
    Prepare(Subject),
    /// Second-phase vote.
    Commit(Subject),
}

impl ConsensusMessage {
    /// The code this body travels under.
    pub fn code(&self) -> MsgCode {
        match self {
            ConsensusMessage::PrePrepare(_) => MsgCode::PrePrepare,
            ConsensusMessage::Prepare(_) => MsgCode::Prepare,
            ConsensusMessage::Commit(_) => MsgCode::Commit,
        }
    }

    /// The view the body refers to.
    pub fn view(&self) -> View {
        match self {
            ConsensusMessage::PrePrepare(preprepare) => preprepare.view,
            ConsensusMessage::Prepare(subject) | ConsensusMessage::Commit(subject) => subject.view,
        }
    }
}
