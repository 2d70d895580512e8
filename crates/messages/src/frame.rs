//! Framed messages as they travel on the wire.

use crate::codec::{self, CodecError};
use crate::consensus::{ConsensusMessage, MsgCode};
use pbft_types::Address;
use sbor::prelude::BasicSbor;

/// A framed consensus message.
///
/// The frame is what the transport carries: the typed body as opaque bytes,
/// the claimed sender, and the host-produced signature over
/// [`signing_input`](Message::signing_input). The core validates sender
/// membership; signature production and recovery are host concerns.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Message {
    /// Which body type `body` decodes to.
    pub code: MsgCode,
    /// SBOR-encoded body.
    pub body: Vec<u8>,
    /// Address of the sender.
    pub sender: Address,
    /// Signature over `code || body`, if the frame has been signed.
    pub signature: Option<Vec<u8>>,
}

impl Message {
    /// Create an unsigned frame.
    pub fn new(code: MsgCode, body: Vec<u8>, sender: Address) -> Self {
        Self {
            code,
            body,
            sender,
            signature: None,
        }
    }

    /// Attach a signature.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    /// The bytes a sender signs: the code byte followed by the body.
    pub fn signing_input(&self) -> Vec<u8> {
        let mut input = Vec::with_capacity(1 + self.body.len());
        input.push(self.code.as_u8());
        input.extend_from_slice(&self.body);
        input
    }

    /// Decode the body as the type named by `code`.
    pub fn decode(&self) -> Result<ConsensusMessage, CodecError> {
        codec::decode_body(self.code, &self.body)
    }

    /// Encode the whole frame to wire format.
    pub fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode_frame(self)
    }

    /// Decode a frame from wire format.
    pub fn from_payload(data: &[u8]) -> Result<Self, CodecError> {
        codec::decode_frame(data)
    }
}
