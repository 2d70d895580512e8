//! Event types and the mux the event loop consumes.

use parking_lot::Mutex;
use pbft_messages::Message;
use pbft_types::{Address, Request};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The host submitted a payload to order.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// The request to order.
    pub request: Request,
}

/// A peer connection came up.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// Address of the peer.
    pub address: Address,
}

/// A framed consensus payload arrived from the network.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Wire bytes, version byte included.
    pub payload: Vec<u8>,
}

/// A previously deferred message became processable and is being replayed.
#[derive(Debug, Clone)]
pub struct BacklogEvent {
    /// The already-decoded frame.
    pub message: Message,
}

/// All possible inputs to the consensus core.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Host request (primary wraps it into a proposal).
    Request(RequestEvent),
    /// Peer connectivity notification.
    Connection(ConnectionEvent),
    /// Inbound consensus message.
    Message(MessageEvent),
    /// Backlog replay.
    Backlog(BacklogEvent),
}

impl CoreEvent {
    /// Event type name, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            CoreEvent::Request(_) => "Request",
            CoreEvent::Connection(_) => "Connection",
            CoreEvent::Message(_) => "Message",
            CoreEvent::Backlog(_) => "Backlog",
        }
    }
}

/// Publish/subscribe channel between the host and the event loop.
///
/// Publishers (`post`) are cheap clones; the single consumer takes the
/// receiving end once via [`subscribe`](EventMux::subscribe). Events are
/// delivered strictly FIFO. The core also posts to its own mux: broadcasts
/// loop back as `Message` events and backlog replays arrive as `Backlog`
/// events, so re-entrancy only ever happens through the queue.
#[derive(Debug, Clone)]
pub struct EventMux {
    tx: mpsc::UnboundedSender<CoreEvent>,
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<CoreEvent>>>>,
}

impl EventMux {
    /// Create a new mux.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Publish an event. Events posted before the loop subscribes are
    /// buffered; events posted after the loop exits are dropped.
    pub fn post(&self, event: CoreEvent) {
        let _ = self.tx.send(event);
    }

    /// Take the receiving end. Returns `None` if already taken.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<CoreEvent>> {
        self.rx.lock().take()
    }
}

impl Default for EventMux {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_buffered_until_subscribe() {
        let mux = EventMux::new();
        mux.post(CoreEvent::Connection(ConnectionEvent {
            address: Address::ZERO,
        }));
        mux.post(CoreEvent::Request(RequestEvent {
            request: Request::new(vec![1]),
        }));

        let mut rx = mux.subscribe().unwrap();
        assert_eq!(rx.try_recv().unwrap().type_name(), "Connection");
        assert_eq!(rx.try_recv().unwrap().type_name(), "Request");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_single_consumer() {
        let mux = EventMux::new();
        assert!(mux.subscribe().is_some());
        assert!(mux.subscribe().is_none());
        assert!(mux.clone().subscribe().is_none());
    }
}
