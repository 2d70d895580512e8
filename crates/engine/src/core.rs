//! The consensus core: state, preamble checks, and event dispatch.

use crate::backend::Backend;
use crate::backlog::Backlogs;
use crate::errors::ConsensusError;
use crate::events::{CoreEvent, EventMux};
use crate::log::{ConsensusLog, SequenceLog};
use pbft_messages::{codec, ConsensusMessage, Message, MsgCode};
use pbft_types::{Address, Proposal, ProposalHeader, Request, Subject, Validator, View};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Phase of the sequence currently being decided.
///
/// The declaration order is the lifecycle order; comparisons rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// Waiting for a request (primary) or a pre-prepare (replica).
    AcceptRequest,
    /// A pre-prepare was accepted; collecting prepares.
    Preprepared,
    /// Prepare quorum reached; collecting commits.
    Prepared,
    /// Commit quorum reached; handing off to the host.
    Committed,
    /// Reserved for checkpointing.
    CheckpointReady,
}

/// The per-replica consensus state machine.
///
/// Owned by a single event-loop task; all methods run on that task. The only
/// state shared outward is the [`ConsensusLog`], which hands out copies.
pub struct Core {
    pub(crate) address: Address,
    pub(crate) n: u64,
    pub(crate) f: u64,
    pub(crate) state: State,

    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) mux: EventMux,

    pub(crate) view_number: u64,
    pub(crate) sequence: u64,
    pub(crate) completed: bool,

    pub(crate) subject: Option<Subject>,
    pub(crate) current: SequenceLog,

    pub(crate) backlogs: Backlogs,
    pub(crate) consensus_log: ConsensusLog,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("address", &self.address)
            .field("n", &self.n)
            .field("f", &self.f)
            .field("state", &self.state)
            .field("view_number", &self.view_number)
            .field("sequence", &self.sequence)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Core {
    /// Create a core around a host backend.
    pub fn new(backend: Arc<dyn Backend>, consensus_log: ConsensusLog) -> Self {
        let validators = backend.validators();
        let n = validators.size() as u64;
        let f = validators.f();
        Self {
            address: backend.address(),
            n,
            f,
            state: State::AcceptRequest,
            mux: backend.event_mux(),
            backend,
            view_number: 0,
            sequence: 0,
            completed: false,
            subject: None,
            current: SequenceLog::new(View::new(0, 1)),
            backlogs: Backlogs::new(2 * n as usize),
            consensus_log,
        }
    }

    /// This replica's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Validator count `N`.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Fault bound `F`.
    pub fn f(&self) -> u64 {
        self.f
    }

    /// Present phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// View number of the last decided view.
    pub fn view_number(&self) -> u64 {
        self.view_number
    }

    /// Last committed sequence.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the most recent sequence produced a commit.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// The subject of the round in progress, if one is open.
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Votes required for quorum: `2F + 1`.
    pub fn quorum(&self) -> u64 {
        2 * self.f + 1
    }

    /// The view the core is deciding right now: the open round's subject
    /// view, or the next sequence when no round is open.
    pub(crate) fn current_view(&self) -> View {
        self.subject
            .as_ref()
            .map(|s| s.view)
            .unwrap_or_else(|| View::new(self.view_number, self.sequence + 1))
    }

    /// Wrap a request payload into a proposal for a sequence.
    pub(crate) fn make_proposal(&self, sequence: u64, request: &Request) -> Proposal {
        let data_hash = self.backend.hash(&request.payload);
        Proposal {
            header: ProposalHeader {
                sequence,
                parent_hash: data_hash.clone(),
                data_hash,
            },
            payload: request.payload.clone(),
        }
    }

    /// Encode, sign, and broadcast a message, then loop it back through the
    /// mux so this replica processes its own vote on the ordinary path.
    pub(crate) fn broadcast(&self, message: ConsensusMessage) {
        let (code, body) = match codec::encode_body(&message) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(%err, "failed to encode message body");
                return;
            }
        };
        let mut frame = Message::new(code, body, self.address);
        let signature = self.backend.sign(&frame.signing_input());
        frame = frame.with_signature(signature);
        let payload = match frame.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                error!(%err, "failed to encode frame");
                return;
            }
        };
        self.backend.send(payload.clone());
        self.mux.post(CoreEvent::Message(crate::events::MessageEvent { payload }));
    }

    /// Move to a new phase. Every transition re-drains the backlog, since
    /// messages inadmissible a moment ago may be processable now.
    pub(crate) fn set_state(&mut self, state: State) {
        if self.state != state {
            trace!(from = ?self.state, to = ?state, "state transition");
            self.state = state;
            self.process_backlog();
        }
    }

    pub(crate) fn process_backlog(&mut self) {
        let now = self.current_view();
        let has_subject = self.subject.is_some();
        self.backlogs.drain(now, self.state, has_subject, &self.mux);
    }

    /// Common preamble for every inbound message: view window, sender
    /// membership, round admissibility. Messages from the future are
    /// deferred to the backlog, and so are current-view votes that arrive
    /// before the round has a subject (a prepare racing its pre-prepare).
    pub(crate) fn check_message(
        &mut self,
        message: &Message,
        view: View,
        src: &Validator,
    ) -> Result<(), ConsensusError> {
        match view.compare(&self.current_view()) {
            Ordering::Greater => {
                self.backlogs
                    .defer(src.address(), view, message.clone())?;
                Err(ConsensusError::FutureMessage)
            }
            Ordering::Less => Err(ConsensusError::OldMessage),
            Ordering::Equal => {
                if !self.backend.validators().contains(message.sender) {
                    return Err(ConsensusError::UnauthorizedSender);
                }
                if message.code != MsgCode::PrePrepare && self.subject.is_none() {
                    self.backlogs
                        .defer(src.address(), view, message.clone())?;
                    return Err(ConsensusError::FutureMessage);
                }
                Ok(())
            }
        }
    }

    /// Single entry point from the event loop.
    pub fn handle_event(&mut self, event: CoreEvent) {
        match event {
            CoreEvent::Request(ev) => {
                if let Err(err) = self.handle_request(&ev.request) {
                    warn!(%err, "request handling failed");
                }
            }
            CoreEvent::Connection(ev) => {
                debug!(peer = %ev.address, "peer connected");
            }
            CoreEvent::Message(ev) => self.handle_payload(&ev.payload),
            CoreEvent::Backlog(ev) => self.handle_frame(&ev.message),
        }
    }

    fn handle_payload(&mut self, payload: &[u8]) {
        match Message::from_payload(payload) {
            Ok(message) => self.handle_frame(&message),
            Err(err) => warn!(%err, "dropping undecodable payload"),
        }
    }

    fn handle_frame(&mut self, message: &Message) {
        let validators = self.backend.validators();
        let Some((_, src)) = validators.get_by_address(message.sender) else {
            warn!(sender = %message.sender, "dropping message from unknown sender");
            return;
        };
        let src = src.clone();
        let result = self.dispatch(message, &src);
        self.log_outcome(message, &result);
    }

    fn dispatch(&mut self, message: &Message, src: &Validator) -> Result<(), ConsensusError> {
        match message.code {
            MsgCode::PrePrepare => self.handle_pre_prepare(message, src),
            MsgCode::Prepare => self.handle_prepare(message, src),
            MsgCode::Commit => self.handle_commit(message, src),
        }
    }

    fn log_outcome(&self, message: &Message, result: &Result<(), ConsensusError>) {
        let code = message.code;
        let sender = message.sender;
        match result {
            Ok(()) => {}
            Err(ConsensusError::FutureMessage) => {
                trace!(?code, %sender, "deferred future message")
            }
            Err(ConsensusError::OldMessage) => {
                trace!(?code, %sender, "dropped stale message")
            }
            Err(err @ ConsensusError::SubjectNotMatched) => {
                info!(?code, %sender, %err, "dropped mismatched vote")
            }
            Err(err @ ConsensusError::HostCommitRejected(_)) => {
                error!(%err, "host rejected commit; awaiting view change")
            }
            Err(err) => warn!(?code, %sender, %err, "dropped message"),
        }
    }
}
