//! PBFT consensus state machine.
//!
//! This crate drives the three-phase `PRE-PREPARE → PREPARE → COMMIT`
//! exchange among `N = 3F + 1` replicas, tolerating up to `F` Byzantine
//! faults and committing exactly one proposal per sequence number.
//!
//! # Architecture
//!
//! The state machine is single-threaded: every input arrives as a
//! [`CoreEvent`] on the [`EventMux`] and is dispatched by a dedicated worker
//! task owned by [`Engine`]. Handlers never block on I/O; the host's
//! [`Backend`] supplies identity, hashing, signing, broadcast, and the
//! durable commit hand-off.
//!
//! ```text
//! host request ──► primary wraps Proposal, broadcasts PRE-PREPARE
//!              ──► replicas validate, broadcast PREPARE
//!              ──► 2F+1 matching PREPARE: broadcast COMMIT
//!              ──► 2F+1 matching COMMIT: Backend::commit, advance sequence
//! ```
//!
//! # Message discipline
//!
//! Every inbound message passes a common preamble: view comparison (future
//! messages are deferred to a per-peer backlog, stale ones dropped), sender
//! membership, and for votes a structural subject match. Out-of-order
//! receipt is absorbed by the backlog, which is re-drained on every state
//! transition.
//!
//! # Lifecycle per sequence
//!
//! ```text
//! AcceptRequest --request (primary) or pre-prepare--> Preprepared
//! Preprepared   --2F+1 matching PREPARE------------> Prepared
//! Prepared      --2F+1 matching COMMIT-------------> Committed
//! Committed     --host commit done-----------------> AcceptRequest (next sequence)
//! ```

mod backend;
mod backlog;
mod commit;
mod core;
mod errors;
mod events;
mod handler;
mod log;
mod prepare;
mod preprepare;
mod request;

#[cfg(test)]
pub(crate) mod testutil;

pub use backend::{Backend, BackendError};
pub use backlog::Backlogs;
pub use self::core::{Core, State};
pub use errors::ConsensusError;
pub use events::{
    BacklogEvent, ConnectionEvent, CoreEvent, EventMux, MessageEvent, RequestEvent,
};
pub use handler::{Engine, EngineError};
pub use log::{ConsensusLog, MessageSet, SequenceLog};
