//! Wire messages for the PBFT consensus protocol.
//!
//! Three message kinds flow between replicas, dispatched by [`MsgCode`]:
//!
//! | Code | Body | Sender |
//! |---|---|---|
//! | `PrePrepare` | [`PrePrepare`] (view + proposal) | primary only |
//! | `Prepare` | [`Subject`](pbft_types::Subject) | any replica |
//! | `Commit` | [`Subject`](pbft_types::Subject) | any replica |
//!
//! Bodies are carried inside a framed [`Message`] together with the sender
//! address and a host-produced signature over `code || body`. Encoding is
//! SBOR: deterministic and length-prefixed, so equal logical messages
//! produce equal byte strings and signatures validate bytewise.

pub mod codec;

mod consensus;
mod frame;

pub use codec::{CodecError, WIRE_VERSION};
pub use consensus::{ConsensusMessage, MsgCode, PrePrepare};
pub use frame::Message;
