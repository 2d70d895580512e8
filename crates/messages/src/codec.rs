//! Message encoding and decoding.
//!
//! # Wire Format
//!
//! ```text
//! [version: u8][frame: SBOR-encoded Message]
//! ```
//!
//! The frame's `body` field is itself an SBOR-encoded typed body; which type
//! is determined by the frame's `code`. The codec validates structure only,
//! never semantics.

use crate::consensus::{ConsensusMessage, MsgCode, PrePrepare};
use crate::frame::Message;
use pbft_types::Subject;
use thiserror::Error;

/// Current wire format version.
pub const WIRE_VERSION: u8 = 1;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown wire version: {0}")]
    UnknownVersion(u8),

    #[error("message too short")]
    MessageTooShort,

    #[error("SBOR decode error: {0}")]
    Decode(String),

    #[error("SBOR encode error: {0}")]
    Encode(String),
}

/// Encode a typed body, returning its code and bytes.
pub fn encode_body(message: &ConsensusMessage) -> Result<(MsgCode, Vec<u8>), CodecError> {
    let bytes = match message {
        ConsensusMessage::PrePrepare(preprepare) => sbor::basic_encode(preprepare),
        ConsensusMessage::Prepare(subject) | ConsensusMessage::Commit(subject) => {
            sbor::basic_encode(subject)
        }
    }
    .map_err(|e| CodecError::Encode(format!("{:?}", e)))?;
    Ok((message.code(), bytes))
}

/// Decode a body as the type its code names.
pub fn decode_body(code: MsgCode, body: &[u8]) -> Result<ConsensusMessage, CodecError> {
    match code {
        MsgCode::PrePrepare => decode_pre_prepare(body).map(ConsensusMessage::PrePrepare),
        MsgCode::Prepare => decode_subject(body).map(ConsensusMessage::Prepare),
        MsgCode::Commit => decode_subject(body).map(ConsensusMessage::Commit),
    }
}

/// Decode a PRE-PREPARE body.
pub fn decode_pre_prepare(body: &[u8]) -> Result<PrePrepare, CodecError> {
    sbor::basic_decode(body).map_err(|e| CodecError::Decode(format!("{:?}", e)))
}

/// Decode a PREPARE/COMMIT subject body.
pub fn decode_subject(body: &[u8]) -> Result<Subject, CodecError> {
    sbor::basic_decode(body).map_err(|e| CodecError::Decode(format!("{:?}", e)))
}

/// Encode a framed message to wire format.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, CodecError> {
    let payload =
        sbor::basic_encode(message).map_err(|e| CodecError::Encode(format!("{:?}", e)))?;
    let mut bytes = Vec::with_capacity(1 + payload.len());
    bytes.push(WIRE_VERSION);
    bytes.extend(payload);
    Ok(bytes)
}

/// Decode a framed message from wire format.
pub fn decode_frame(data: &[u8]) -> Result<Message, CodecError> {
    let (&version, payload) = data.split_first().ok_or(CodecError::MessageTooShort)?;
    if version != WIRE_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    sbor::basic_decode(payload).map_err(|e| CodecError::Decode(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbft_types::{Address, Digest, Proposal, ProposalHeader, View};

    fn make_proposal() -> Proposal {
        Proposal {
            header: ProposalHeader {
                sequence: 1,
                parent_hash: Digest::from_slice(&[0xaa; 32]),
                data_hash: Digest::from_slice(&[0xbb; 32]),
            },
            payload: b"block payload".to_vec(),
        }
    }

    fn make_subject() -> Subject {
        Subject::new(View::new(0, 1), Digest::from_slice(&[0xbb; 32]))
    }

    #[test]
    fn test_body_round_trip_pre_prepare() {
        let body = ConsensusMessage::PrePrepare(PrePrepare::new(View::new(0, 1), make_proposal()));
        let (code, bytes) = encode_body(&body).unwrap();
        assert_eq!(code, MsgCode::PrePrepare);
        assert_eq!(decode_body(code, &bytes).unwrap(), body);
    }

    #[test]
    fn test_body_round_trip_votes() {
        for body in [
            ConsensusMessage::Prepare(make_subject()),
            ConsensusMessage::Commit(make_subject()),
        ] {
            let (code, bytes) = encode_body(&body).unwrap();
            assert_eq!(decode_body(code, &bytes).unwrap(), body);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let body = ConsensusMessage::Prepare(make_subject());
        let (_, first) = encode_body(&body).unwrap();
        let (_, second) = encode_body(&body.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_frame_round_trip() {
        let (code, body) =
            encode_body(&ConsensusMessage::Commit(make_subject())).unwrap();
        let message = Message::new(code, body, Address::new([7; 20]));
        let bytes = encode_frame(&message).unwrap();
        assert_eq!(bytes[0], WIRE_VERSION);
        assert_eq!(decode_frame(&bytes).unwrap(), message);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let result = decode_frame(&[99, 1, 2, 3]);
        assert_eq!(result, Err(CodecError::UnknownVersion(99)));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(decode_frame(&[]), Err(CodecError::MessageTooShort));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let (code, body) =
            encode_body(&ConsensusMessage::Prepare(make_subject())).unwrap();
        let message = Message::new(code, body, Address::new([7; 20]));
        let bytes = encode_frame(&message).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            decode_frame(truncated),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_absent_view_fields_survive_round_trip() {
        // a subject whose sequence was maliciously omitted still decodes,
        // and decodes to something that matches no complete subject
        let truncated = Subject::new(
            View {
                view_number: Some(0),
                sequence: None,
            },
            Digest::from_slice(&[1]),
        );
        let (code, bytes) = encode_body(&ConsensusMessage::Commit(truncated.clone())).unwrap();
        let decoded = decode_body(code, &bytes).unwrap();
        assert_eq!(decoded, ConsensusMessage::Commit(truncated.clone()));
        assert_ne!(truncated, make_subject());
    }
}
