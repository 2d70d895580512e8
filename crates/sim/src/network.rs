//! In-memory broadcast fabric.

use parking_lot::RwLock;
use pbft_engine::{ConnectionEvent, CoreEvent, EventMux, MessageEvent};
use pbft_types::Address;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Delivers broadcast payloads to every replica except the sender.
///
/// The engine already loops a replica's own broadcasts back through its
/// mux, so the fabric only carries traffic to peers. Delivery is immediate,
/// lossless, and in send order per sender.
#[derive(Debug, Clone, Default)]
pub struct SimNetwork {
    muxes: Arc<RwLock<BTreeMap<Address, EventMux>>>,
}

impl SimNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a replica's mux.
    pub fn join(&self, address: Address, mux: EventMux) {
        self.muxes.write().insert(address, mux);
    }

    /// Number of registered replicas.
    pub fn size(&self) -> usize {
        self.muxes.read().len()
    }

    /// Deliver a framed payload to every replica except `from`.
    pub fn broadcast(&self, from: Address, payload: Vec<u8>) {
        for (address, mux) in self.muxes.read().iter() {
            if *address == from {
                continue;
            }
            trace!(%from, to = %address, bytes = payload.len(), "delivering payload");
            mux.post(CoreEvent::Message(MessageEvent {
                payload: payload.clone(),
            }));
        }
    }

    /// Announce a replica's connection to every other replica.
    pub fn announce(&self, address: Address) {
        for (peer, mux) in self.muxes.read().iter() {
            if *peer == address {
                continue;
            }
            mux.post(CoreEvent::Connection(ConnectionEvent { address }));
        }
    }
}
