//! PRE-PREPARE handling.

use crate::core::{Core, State};
use crate::errors::ConsensusError;
use crate::log::SequenceLog;
use pbft_messages::{codec, ConsensusMessage, Message};
use pbft_types::{Subject, Validator};
use tracing::debug;

impl Core {
    /// Handle a pre-prepare from the proposer.
    ///
    /// Accepting one opens the round: the subject is fixed, the state moves
    /// to `Preprepared`, and a PREPARE over the subject goes out.
    pub(crate) fn handle_pre_prepare(
        &mut self,
        message: &Message,
        src: &Validator,
    ) -> Result<(), ConsensusError> {
        let pre_prepare = codec::decode_pre_prepare(&message.body)?;
        self.check_message(message, pre_prepare.view, src)?;

        // only the proposer of the local view number may open a round
        let proposer = self
            .backend
            .validators()
            .proposer(self.view_number)
            .map(|v| v.address);
        if proposer != Some(src.address()) {
            return Err(ConsensusError::UnauthorizedProposer);
        }

        if self.state != State::AcceptRequest {
            debug!(state = ?self.state, "pre-prepare ignored: round already open");
            return Ok(());
        }

        if pre_prepare.proposal.sequence() != self.sequence + 1 {
            return Err(ConsensusError::InvalidProposal);
        }

        let digest = pre_prepare.proposal.header.data_hash.clone();
        let subject = Subject::new(pre_prepare.view, digest);

        debug!(view = %pre_prepare.view, "accepted pre-prepare");

        let mut current = SequenceLog::new(pre_prepare.view);
        current.set_pre_prepare(pre_prepare);
        self.current = current;
        self.subject = Some(subject);
        self.completed = false;
        self.set_state(State::Preprepared);
        self.send_prepare();
        Ok(())
    }

    fn send_prepare(&mut self) {
        if let Some(subject) = self.subject.clone() {
            debug!(view = %subject.view, "broadcasting prepare");
            self.broadcast(ConsensusMessage::Prepare(subject));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestSystem;
    use pbft_types::{Digest, View};

    #[test]
    fn test_pre_prepare_from_proposer_accepted() {
        let mut sys = TestSystem::new(4);
        let message = sys.pre_prepare_message(0, View::new(0, 1), b"block one");
        let src = sys.validator(0);

        sys.cores[1].handle_pre_prepare(&message, &src).unwrap();

        let core = &sys.cores[1];
        assert_eq!(core.state(), State::Preprepared);
        let subject = core.subject().unwrap();
        assert_eq!(subject.view, View::new(0, 1));
        assert_eq!(
            subject.digest,
            sys.backends[1].hash_of(b"block one")
        );
        assert!(!core.completed());

        // a prepare over the subject went out
        let sent = sys.backends[1].sent();
        assert_eq!(sent.len(), 1);
        match TestSystem::decode_payload(&sent[0]) {
            ConsensusMessage::Prepare(prepared) => assert_eq!(&prepared, subject),
            other => panic!("expected prepare, got {:?}", other),
        }
    }

    #[test]
    fn test_pre_prepare_from_non_proposer_rejected() {
        let mut sys = TestSystem::new(4);
        let message = sys.pre_prepare_message(1, View::new(0, 1), b"imposter");
        let src = sys.validator(1);

        assert_eq!(
            sys.cores[2].handle_pre_prepare(&message, &src),
            Err(ConsensusError::UnauthorizedProposer)
        );
        assert_eq!(sys.cores[2].state(), State::AcceptRequest);
        assert!(sys.cores[2].subject().is_none());
    }

    #[test]
    fn test_pre_prepare_with_gapped_sequence_rejected() {
        let mut sys = TestSystem::new(4);
        // view says sequence 1, header says 2: does not extend the chain
        let mut message = sys.pre_prepare_message(0, View::new(0, 1), b"gap");
        let mut body = codec::decode_pre_prepare(&message.body).unwrap();
        body.proposal.header.sequence = 2;
        let (_, bytes) =
            codec::encode_body(&ConsensusMessage::PrePrepare(body)).unwrap();
        message.body = bytes;
        let src = sys.validator(0);

        assert_eq!(
            sys.cores[1].handle_pre_prepare(&message, &src),
            Err(ConsensusError::InvalidProposal)
        );
    }

    #[test]
    fn test_future_pre_prepare_deferred() {
        let mut sys = TestSystem::new(4);
        let message = sys.pre_prepare_message(0, View::new(0, 3), b"too early");
        let src = sys.validator(0);

        assert_eq!(
            sys.cores[1].handle_pre_prepare(&message, &src),
            Err(ConsensusError::FutureMessage)
        );
        assert_eq!(sys.cores[1].backlogs.depth(src.address()), 1);
        assert_eq!(sys.cores[1].state(), State::AcceptRequest);
    }

    #[test]
    fn test_duplicate_pre_prepare_ignored() {
        let mut sys = TestSystem::new(4);
        let message = sys.pre_prepare_message(0, View::new(0, 1), b"block one");
        let src = sys.validator(0);

        sys.cores[1].handle_pre_prepare(&message, &src).unwrap();
        let subject = sys.cores[1].subject().unwrap().clone();

        // same round again: dropped, subject and votes untouched
        sys.cores[1].handle_pre_prepare(&message, &src).unwrap();
        assert_eq!(sys.cores[1].subject().unwrap(), &subject);
        assert_eq!(sys.backends[1].sent().len(), 1);
    }
}
