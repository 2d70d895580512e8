//! The event loop.

use crate::backend::Backend;
use crate::core::Core;
use crate::log::ConsensusLog;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// `start` was called on an engine that has been stopped. Construct a
    /// fresh instance instead.
    #[error("engine was stopped; restart is not supported")]
    Stopped,

    /// The backend's event mux was already subscribed by another consumer.
    #[error("event mux already subscribed")]
    MuxBusy,
}

/// Drives a [`Core`] from the backend's event mux on a dedicated task.
///
/// Events are dispatched strictly FIFO; no handler is re-entrant, because
/// handlers only ever enqueue (broadcast loopback, backlog replay) and
/// never call back into dispatch. `stop` lets the in-flight event finish,
/// then exits the loop; deferred backlog entries die with it.
pub struct Engine {
    backend: Arc<dyn Backend>,
    consensus_log: ConsensusLog,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

impl Engine {
    /// Create an engine around a host backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            consensus_log: ConsensusLog::new(),
            shutdown: None,
            handle: None,
            stopped: false,
        }
    }

    /// Handle for reading committed records; clonable and safe to hold
    /// while the engine runs.
    pub fn consensus_log(&self) -> ConsensusLog {
        self.consensus_log.clone()
    }

    /// Whether the event loop is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start the event loop. Idempotent while running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.handle.is_some() {
            return Ok(());
        }
        if self.stopped {
            return Err(EngineError::Stopped);
        }
        let mut events = self
            .backend
            .event_mux()
            .subscribe()
            .ok_or(EngineError::MuxBusy)?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut core = Core::new(self.backend.clone(), self.consensus_log.clone());

        let handle = tokio::spawn(async move {
            debug!(address = %core.address(), "consensus event loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    event = events.recv() => match event {
                        Some(event) => core.handle_event(event),
                        None => break,
                    },
                }
            }
            debug!(address = %core.address(), "consensus event loop exited");
        });

        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the event loop after any in-flight event. Idempotent.
    pub async fn stop(&mut self) {
        self.stopped = true;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
