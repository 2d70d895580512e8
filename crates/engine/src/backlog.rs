//! Per-peer deferral of messages that arrived too early.

use crate::core::State;
use crate::errors::ConsensusError;
use crate::events::{BacklogEvent, CoreEvent, EventMux};
use pbft_messages::{Message, MsgCode};
use pbft_types::{Address, View};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use tracing::trace;

/// A deferred message, ordered by `(view, code rank)` ascending.
#[derive(Debug, Clone)]
struct BacklogEntry {
    view: View,
    code: MsgCode,
    message: Message,
}

impl BacklogEntry {
    fn key(&self) -> (View, u8) {
        (self.view, self.code.rank())
    }
}

impl PartialEq for BacklogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for BacklogEntry {}

impl PartialOrd for BacklogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BacklogEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// What to do with a current-view entry during a drain.
enum Disposition {
    /// Re-inject into the event loop.
    Replay,
    /// Not admissible yet; leave it queued.
    Keep,
    /// Can never become admissible in this round; drop it.
    Discard,
}

fn disposition(state: State, has_subject: bool, code: MsgCode) -> Disposition {
    match code {
        // a pre-prepare only opens a round from AcceptRequest; once the
        // round is open another one is useless
        MsgCode::PrePrepare => {
            if state == State::AcceptRequest {
                Disposition::Replay
            } else {
                Disposition::Discard
            }
        }
        // votes are countable as soon as the subject exists
        MsgCode::Prepare | MsgCode::Commit => {
            if state != State::AcceptRequest || has_subject {
                Disposition::Replay
            } else {
                Disposition::Keep
            }
        }
    }
}

/// Per-validator priority queues of deferred messages.
///
/// Keyed by sender address (not validator identity) and drained in address
/// order so no peer can starve another. Each peer's queue is capped; inserts
/// beyond the cap are rejected with [`ConsensusError::BacklogOverflow`].
#[derive(Debug)]
pub struct Backlogs {
    queues: BTreeMap<Address, BinaryHeap<Reverse<BacklogEntry>>>,
    capacity: usize,
}

impl Backlogs {
    /// Create backlogs with a per-peer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: BTreeMap::new(),
            capacity,
        }
    }

    /// Defer a message from a sender.
    pub fn defer(
        &mut self,
        sender: Address,
        view: View,
        message: Message,
    ) -> Result<(), ConsensusError> {
        let queue = self.queues.entry(sender).or_default();
        if queue.len() >= self.capacity {
            return Err(ConsensusError::BacklogOverflow);
        }
        trace!(peer = %sender, %view, code = ?message.code, "deferring message");
        queue.push(Reverse(BacklogEntry {
            view,
            code: message.code,
            message,
        }));
        Ok(())
    }

    /// Replay every entry that is no longer in the future and is admissible
    /// in the present state. Strictly-past entries are discarded; future and
    /// not-yet-admissible entries stay queued.
    pub fn drain(&mut self, now: View, state: State, has_subject: bool, mux: &EventMux) {
        for (address, queue) in self.queues.iter_mut() {
            while let Some(Reverse(entry)) = queue.pop() {
                match entry.view.compare(&now) {
                    Ordering::Less => {
                        trace!(peer = %address, view = %entry.view, "dropping stale backlog entry");
                    }
                    Ordering::Greater => {
                        queue.push(Reverse(entry));
                        break;
                    }
                    Ordering::Equal => match disposition(state, has_subject, entry.code) {
                        Disposition::Replay => {
                            trace!(peer = %address, view = %entry.view, code = ?entry.code, "replaying backlog entry");
                            mux.post(CoreEvent::Backlog(BacklogEvent {
                                message: entry.message,
                            }));
                        }
                        Disposition::Keep => {
                            queue.push(Reverse(entry));
                            break;
                        }
                        Disposition::Discard => {
                            trace!(peer = %address, code = ?entry.code, "discarding inadmissible backlog entry");
                        }
                    },
                }
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
    }

    /// Number of entries deferred for a sender.
    pub fn depth(&self, sender: Address) -> usize {
        self.queues.get(&sender).map_or(0, |q| q.len())
    }
}
