//! COMMIT handling and the commit procedure.

use crate::core::{Core, State};
use crate::errors::ConsensusError;
use crate::log::SequenceLog;
use pbft_messages::{codec, Message};
use pbft_types::{Subject, Validator, View};
use tracing::{debug, trace, warn};

impl Core {
    /// Handle a commit vote.
    pub(crate) fn handle_commit(
        &mut self,
        message: &Message,
        src: &Validator,
    ) -> Result<(), ConsensusError> {
        let subject = codec::decode_subject(&message.body)?;
        self.check_message(message, subject.view, src)?;
        self.verify_commit(&subject)?;
        self.accept_commit(message);

        if self.current.commits().len() as u64 >= self.quorum()
            && self.state == State::Prepared
        {
            self.commit()?;
        }
        Ok(())
    }

    /// Structural comparison against the local subject. An absent inner
    /// field matches nothing.
    pub(crate) fn verify_commit(&self, subject: &Subject) -> Result<(), ConsensusError> {
        match &self.subject {
            Some(local) if local == subject => Ok(()),
            _ => Err(ConsensusError::SubjectNotMatched),
        }
    }

    fn accept_commit(&mut self, message: &Message) {
        if !self.current.commits_mut().insert(message.clone()) {
            trace!(sender = %message.sender, "duplicate commit ignored");
        }
    }

    /// The commit procedure: hand the decided proposal to the host, record
    /// the round, advance the timeline, and open the next sequence.
    ///
    /// Runs at most once per sequence: it is only reachable from
    /// `Prepared`, and the first thing it does is leave that state. If the
    /// host rejects, the core stays parked in `Committed` with nothing
    /// recorded or advanced, awaiting a view change.
    pub(crate) fn commit(&mut self) -> Result<(), ConsensusError> {
        self.set_state(State::Committed);

        let proposal = match self.current.proposal() {
            Some(proposal) => proposal.clone(),
            None => {
                warn!("commit quorum without a pre-prepare on record");
                return Err(ConsensusError::InvalidProposal);
            }
        };

        debug!(view = %self.current.view(), "ready to commit");
        self.backend
            .commit(proposal)
            .map_err(|err| ConsensusError::HostCommitRejected(err.to_string()))?;

        self.consensus_log.append(self.current.clone());

        if let Some((view_number, sequence)) = self.current.view().pair() {
            self.view_number = view_number;
            self.sequence = sequence;
        }
        self.completed = true;

        self.subject = None;
        self.current = SequenceLog::new(View::new(self.view_number, self.sequence + 1));
        self.set_state(State::AcceptRequest);
        Ok(())
    }
}
