//! Host request handling (primary only).

use crate::core::{Core, State};
use crate::errors::ConsensusError;
use pbft_messages::{ConsensusMessage, PrePrepare};
use pbft_types::{Request, View};
use tracing::debug;

impl Core {
    /// Handle a request from the host.
    ///
    /// Only the primary acts on requests, and only between sequences;
    /// anything else is dropped without error.
    pub(crate) fn handle_request(&mut self, request: &Request) -> Result<(), ConsensusError> {
        if self.state != State::AcceptRequest {
            debug!(state = ?self.state, "request ignored while a sequence is in flight");
            return Ok(());
        }
        if !self.backend.is_proposer() {
            debug!("request ignored: not the proposer");
            return Ok(());
        }
        self.send_pre_prepare(request);
        Ok(())
    }

    /// Wrap the request into a proposal for the next sequence and announce
    /// it. The broadcast loops back through the mux, so the primary accepts
    /// its own pre-prepare exactly like every other replica.
    fn send_pre_prepare(&mut self, request: &Request) {
        let sequence = self.sequence + 1;
        let view = View::new(self.view_number, sequence);
        let proposal = self.make_proposal(sequence, request);
        debug!(%view, "broadcasting pre-prepare");
        self.broadcast(ConsensusMessage::PrePrepare(PrePrepare::new(view, proposal)));
    }
}
