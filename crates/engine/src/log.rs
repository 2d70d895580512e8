//! Per-sequence records and the append-only consensus log.

use parking_lot::RwLock;
use pbft_messages::{Message, PrePrepare};
use pbft_types::{Address, Proposal, View};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Votes collected for one phase of one sequence.
///
/// At most one message per sender address: a second vote from the same
/// sender leaves the set unchanged, which is the duplicate suppression
/// invariant quorum counting relies on.
#[derive(Debug, Clone)]
pub struct MessageSet {
    view: View,
    messages: BTreeMap<Address, Message>,
}

impl MessageSet {
    /// Create an empty set for a view.
    pub fn new(view: View) -> Self {
        Self {
            view,
            messages: BTreeMap::new(),
        }
    }

    /// The view this set collects votes for.
    pub fn view(&self) -> View {
        self.view
    }

    /// Insert a vote. Returns `false` if this sender already voted.
    pub fn insert(&mut self, message: Message) -> bool {
        match self.messages.entry(message.sender) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(message);
                true
            }
        }
    }

    /// Number of distinct senders that voted.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no votes were collected.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a sender has voted.
    pub fn contains(&self, address: Address) -> bool {
        self.messages.contains_key(&address)
    }

    /// Iterate voters in address order.
    pub fn senders(&self) -> impl Iterator<Item = &Address> {
        self.messages.keys()
    }
}

/// Everything recorded for one active sequence: the accepted pre-prepare
/// and the prepare/commit votes.
#[derive(Debug, Clone)]
pub struct SequenceLog {
    view: View,
    pre_prepare: Option<PrePrepare>,
    prepares: MessageSet,
    commits: MessageSet,
}

impl SequenceLog {
    /// Create an empty record for a view.
    pub fn new(view: View) -> Self {
        Self {
            view,
            pre_prepare: None,
            prepares: MessageSet::new(view),
            commits: MessageSet::new(view),
        }
    }

    /// The view being decided.
    pub fn view(&self) -> View {
        self.view
    }

    /// The sequence being decided, if the view is complete.
    pub fn sequence(&self) -> Option<u64> {
        self.view.sequence
    }

    /// Record the accepted pre-prepare.
    pub fn set_pre_prepare(&mut self, pre_prepare: PrePrepare) {
        self.pre_prepare = Some(pre_prepare);
    }

    /// The accepted pre-prepare, if any.
    pub fn pre_prepare(&self) -> Option<&PrePrepare> {
        self.pre_prepare.as_ref()
    }

    /// The proposal under decision, if a pre-prepare was accepted.
    pub fn proposal(&self) -> Option<&Proposal> {
        self.pre_prepare.as_ref().map(|p| &p.proposal)
    }

    /// Collected PREPARE votes.
    pub fn prepares(&self) -> &MessageSet {
        &self.prepares
    }

    /// Collected PREPARE votes, mutable.
    pub fn prepares_mut(&mut self) -> &mut MessageSet {
        &mut self.prepares
    }

    /// Collected COMMIT votes.
    pub fn commits(&self) -> &MessageSet {
        &self.commits
    }

    /// Collected COMMIT votes, mutable.
    pub fn commits_mut(&mut self) -> &mut MessageSet {
        &mut self.commits
    }
}

/// Append-only log of committed sequences.
///
/// The event loop is the only writer; the host may hold a cloned handle and
/// read committed records concurrently. Entries are cloned out, never lent
/// out mutably, so the append-only property cannot be broken by a reader.
#[derive(Debug, Clone, Default)]
pub struct ConsensusLog {
    entries: Arc<RwLock<Vec<SequenceLog>>>,
}

impl ConsensusLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed record.
    pub fn append(&self, entry: SequenceLog) {
        self.entries.write().push(entry);
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has committed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the record at an index.
    pub fn get(&self, index: usize) -> Option<SequenceLog> {
        self.entries.read().get(index).cloned()
    }

    /// Copy of the most recent record.
    pub fn latest(&self) -> Option<SequenceLog> {
        self.entries.read().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbft_messages::MsgCode;

    fn vote(sender: u8) -> Message {
        Message::new(MsgCode::Prepare, vec![1, 2, 3], Address::new([sender; 20]))
    }

    #[test]
    fn test_message_set_suppresses_duplicates() {
        let mut set = MessageSet::new(View::new(0, 1));
        assert!(set.insert(vote(1)));
        assert!(set.insert(vote(2)));
        assert!(!set.insert(vote(1)));
        assert_eq!(set.len(), 2);
        assert!(set.contains(Address::new([1; 20])));
        assert!(!set.contains(Address::new([3; 20])));
    }

    #[test]
    fn test_senders_iterate_in_address_order() {
        let mut set = MessageSet::new(View::new(0, 1));
        set.insert(vote(3));
        set.insert(vote(1));
        set.insert(vote(2));
        let senders: Vec<_> = set.senders().copied().collect();
        assert_eq!(
            senders,
            vec![
                Address::new([1; 20]),
                Address::new([2; 20]),
                Address::new([3; 20])
            ]
        );
    }

    #[test]
    fn test_consensus_log_appends_and_reads() {
        let log = ConsensusLog::new();
        assert!(log.is_empty());

        log.append(SequenceLog::new(View::new(0, 0)));
        log.append(SequenceLog::new(View::new(0, 1)));

        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).unwrap().sequence(), Some(0));
        assert_eq!(log.get(1).unwrap().sequence(), Some(1));
        assert_eq!(log.latest().unwrap().sequence(), Some(1));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn test_readers_get_copies() {
        let log = ConsensusLog::new();
        log.append(SequenceLog::new(View::new(0, 0)));

        let mut copy = log.get(0).unwrap();
        copy.prepares_mut().insert(vote(1));

        // the stored record is unchanged
        assert!(log.get(0).unwrap().prepares().is_empty());
    }
}
