//! In-crate test harness: a recording backend and a multi-replica system.

use crate::backend::{Backend, BackendError};
use crate::core::{Core, State};
use crate::events::EventMux;
use crate::log::{ConsensusLog, SequenceLog};
use parking_lot::Mutex;
use pbft_messages::{codec, ConsensusMessage, Message, PrePrepare};
use pbft_types::{
    Address, Digest, Proposal, ProposalHeader, PublicKey, Subject, Validator, ValidatorSet, View,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A backend that records what the core asked of it.
pub(crate) struct TestBackend {
    address: Address,
    validators: ValidatorSet,
    mux: EventMux,
    sent: Mutex<Vec<Vec<u8>>>,
    committed: Mutex<Vec<Proposal>>,
    reject: AtomicBool,
}

impl TestBackend {
    pub fn new(address: Address, validators: ValidatorSet) -> Self {
        Self {
            address,
            validators,
            mux: EventMux::new(),
            sent: Mutex::new(vec![]),
            committed: Mutex::new(vec![]),
            reject: AtomicBool::new(false),
        }
    }

    /// Payloads broadcast so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Proposals handed off so far.
    pub fn committed(&self) -> Vec<Proposal> {
        self.committed.lock().clone()
    }

    /// Make subsequent commits fail.
    pub fn reject_commits(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// The digest this backend computes for a payload.
    pub fn hash_of(&self, data: &[u8]) -> Digest {
        self.hash(data)
    }
}

impl Backend for TestBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn validators(&self) -> ValidatorSet {
        self.validators.clone()
    }

    fn is_proposer(&self) -> bool {
        self.validators.proposer(0).map(|v| v.address) == Some(self.address)
    }

    fn hash(&self, data: &[u8]) -> Digest {
        Digest::from_slice(blake3::hash(data).as_bytes())
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        // sham signature: address tag plus a digest prefix
        let mut signature = self.address.as_bytes().to_vec();
        signature.extend_from_slice(&blake3::hash(data).as_bytes()[..8]);
        signature
    }

    fn send(&self, payload: Vec<u8>) {
        self.sent.lock().push(payload);
    }

    fn commit(&self, proposal: Proposal) -> Result<(), BackendError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(BackendError::CommitRejected("host refused".to_string()));
        }
        self.committed.lock().push(proposal);
        Ok(())
    }

    fn event_mux(&self) -> EventMux {
        self.mux.clone()
    }
}

/// `N` replicas sharing one validator set, driven synchronously.
pub(crate) struct TestSystem {
    pub backends: Vec<Arc<TestBackend>>,
    pub cores: Vec<Core>,
}

impl TestSystem {
    /// Build a system of `n` replicas. Replica `i` has address `[i; 20]`,
    /// so the sorted validator order matches the replica index and replica
    /// 0 is the proposer for view number 0.
    pub fn new(n: u64) -> Self {
        let validators = ValidatorSet::new(
            (0..n)
                .map(|i| {
                    Validator::new(
                        Address::new([i as u8; 20]),
                        PublicKey::new(vec![i as u8; 33]),
                    )
                })
                .collect(),
        );
        let backends: Vec<_> = (0..n)
            .map(|i| {
                Arc::new(TestBackend::new(
                    Address::new([i as u8; 20]),
                    validators.clone(),
                ))
            })
            .collect();
        let cores = backends
            .iter()
            .map(|backend| {
                Core::new(
                    backend.clone() as Arc<dyn Backend>,
                    ConsensusLog::new(),
                )
            })
            .collect();
        Self { backends, cores }
    }

    /// Validator record for replica `i`.
    pub fn validator(&self, i: usize) -> Validator {
        self.backends[0]
            .validators
            .get_by_index(i)
            .expect("replica index in range")
            .clone()
    }

    /// Put replica `i` into an open round: subject fixed, matching
    /// pre-prepare on record, state as given.
    pub fn prime(&mut self, i: usize, subject: &Subject, state: State) {
        let sequence = subject.view.sequence.unwrap_or(0);
        let proposal = Proposal {
            header: ProposalHeader {
                sequence,
                parent_hash: subject.digest.clone(),
                data_hash: subject.digest.clone(),
            },
            payload: vec![],
        };
        let mut current = SequenceLog::new(subject.view);
        current.set_pre_prepare(PrePrepare::new(subject.view, proposal));

        let core = &mut self.cores[i];
        core.current = current;
        core.subject = Some(subject.clone());
        core.state = state;
    }

    /// A framed PRE-PREPARE from replica `from`, proposal built from a
    /// payload the way the primary would build it.
    pub fn pre_prepare_message(&self, from: usize, view: View, payload: &[u8]) -> Message {
        let data_hash = self.backends[from].hash_of(payload);
        let proposal = Proposal {
            header: ProposalHeader {
                sequence: view.sequence.unwrap_or(0),
                parent_hash: data_hash.clone(),
                data_hash,
            },
            payload: payload.to_vec(),
        };
        self.frame(
            from,
            ConsensusMessage::PrePrepare(PrePrepare::new(view, proposal)),
        )
    }

    /// A framed PREPARE from replica `from`.
    pub fn prepare_message(&self, from: usize, subject: &Subject) -> Message {
        self.frame(from, ConsensusMessage::Prepare(subject.clone()))
    }

    /// A framed COMMIT from replica `from`.
    pub fn commit_message(&self, from: usize, subject: &Subject) -> Message {
        self.frame(from, ConsensusMessage::Commit(subject.clone()))
    }

    fn frame(&self, from: usize, body: ConsensusMessage) -> Message {
        let (code, bytes) = codec::encode_body(&body).expect("encodable body");
        let sender = self.validator(from).address();
        let frame = Message::new(code, bytes, sender);
        let signature = self.backends[from].sign(&frame.signing_input());
        frame.with_signature(signature)
    }

    /// Decode a broadcast payload back into its typed body.
    pub fn decode_payload(payload: &[u8]) -> ConsensusMessage {
        Message::from_payload(payload)
            .expect("decodable frame")
            .decode()
            .expect("decodable body")
    }
}
