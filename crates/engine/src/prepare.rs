//! PREPARE handling.

use crate::core::{Core, State};
use crate::errors::ConsensusError;
use pbft_messages::{codec, ConsensusMessage, Message};
use pbft_types::{Subject, Validator};
use tracing::{debug, trace};

impl Core {
    /// Handle a prepare vote.
    ///
    /// Subject equality is the only gate after the view check, so a prepare
    /// that raced ahead of the local pre-prepare still counts once the
    /// subject is known.
    pub(crate) fn handle_prepare(
        &mut self,
        message: &Message,
        src: &Validator,
    ) -> Result<(), ConsensusError> {
        let subject = codec::decode_subject(&message.body)?;
        self.check_message(message, subject.view, src)?;
        self.verify_prepare(&subject)?;
        self.accept_prepare(message);

        if self.current.prepares().len() as u64 >= self.quorum()
            && (self.state == State::Preprepared
                || (self.state == State::AcceptRequest && self.subject.is_some()))
        {
            self.set_state(State::Prepared);
            self.send_commit();
        }
        Ok(())
    }

    /// Structural comparison against the local subject. An absent inner
    /// field matches nothing.
    pub(crate) fn verify_prepare(&self, subject: &Subject) -> Result<(), ConsensusError> {
        match &self.subject {
            Some(local) if local == subject => Ok(()),
            _ => Err(ConsensusError::SubjectNotMatched),
        }
    }

    fn accept_prepare(&mut self, message: &Message) {
        if !self.current.prepares_mut().insert(message.clone()) {
            trace!(sender = %message.sender, "duplicate prepare ignored");
        }
    }

    pub(crate) fn send_commit(&mut self) {
        if let Some(subject) = self.subject.clone() {
            debug!(view = %subject.view, "broadcasting commit");
            self.broadcast(ConsensusMessage::Commit(subject));
        }
    }
}
