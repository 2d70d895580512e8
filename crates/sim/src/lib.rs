//! In-memory simulation host for the PBFT engine.
//!
//! Provides the pieces a test needs to run real multi-replica consensus
//! without a transport or a chain:
//!
//! - [`SimNetwork`]: a broadcast fabric that delivers framed payloads to
//!   every other replica's event mux.
//! - [`SimBackend`]: a [`Backend`](pbft_engine::Backend) whose commit
//!   hand-off appends to an in-memory chain.
//! - [`SimCluster`]: `N` replicas wired together, each with its own engine.
//!
//! Delivery is immediate and lossless; reordering and partitions are
//! expressed by which engines a test starts and what it feeds them.

mod backend;
mod network;

pub use backend::SimBackend;
pub use network::SimNetwork;

use pbft_engine::{Backend, CoreEvent, Engine, RequestEvent};
use pbft_types::{Address, PublicKey, Request, Validator, ValidatorSet};
use std::sync::Arc;

/// `N` replicas on one in-memory network.
pub struct SimCluster {
    /// The shared broadcast fabric.
    pub network: SimNetwork,
    /// One backend per replica, index-aligned with `engines`.
    pub backends: Vec<Arc<SimBackend>>,
    /// One engine per replica.
    pub engines: Vec<Engine>,
}

impl SimCluster {
    /// Build a cluster of `n` replicas. Replica `i` gets address `[i; 20]`,
    /// so the index order matches the validator-set order and replica 0
    /// proposes for view number 0.
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
        let network = SimNetwork::new();
        let backends: Vec<_> = (0..n)
            .map(|i| {
                Arc::new(SimBackend::new(
                    Address::new([i as u8; 20]),
                    validators.clone(),
                    network.clone(),
                ))
            })
            .collect();
        for backend in &backends {
            network.join(backend.address(), backend.event_mux());
        }
        let engines = backends
            .iter()
            .map(|backend| Engine::new(backend.clone() as Arc<dyn Backend>))
            .collect();
        Self {
            network,
            backends,
            engines,
        }
    }

    /// Start every engine. Must run inside a tokio runtime.
    pub fn start(&mut self) {
        for engine in &mut self.engines {
            engine.start().expect("engine starts");
        }
    }

    /// Start only the given replicas (e.g. to model a crashed quorum).
    pub fn start_only(&mut self, indices: &[usize]) {
        for &i in indices {
            self.engines[i].start().expect("engine starts");
        }
    }

    /// Stop every engine.
    pub async fn stop(&mut self) {
        for engine in &mut self.engines {
            engine.stop().await;
        }
    }

    /// Submit a request to replica `i`.
    pub fn submit(&self, i: usize, payload: Vec<u8>) {
        self.backends[i]
            .event_mux()
            .post(CoreEvent::Request(RequestEvent {
                request: Request::new(payload),
            }));
    }

    /// Index of the proposer for view number 0.
    pub fn proposer_index(&self) -> usize {
        self.backends
            .iter()
            .position(|b| b.is_proposer())
            .expect("one replica proposes")
    }
}
