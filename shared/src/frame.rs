//! Fixed-size wire frame.
//!
//! Every message travels as one frame of exactly [`FRAME_SIZE`] bytes:
//!
//! ```text
//! [id: u64][payload_len: u64][kind: u32][payload: PAYLOAD_CAPACITY + 4 padding]
//! ```
//!
//! Numeric envelope fields use the host's native byte order. Both peers run on
//! the same machine (or at least the same architecture), so no network-order
//! conversion is applied. Bytes beyond `payload_len` are zero on the wire and
//! ignored on receipt.

use crate::error::ProtocolError;

/// Identity assigned to an authenticated session. Zero means unassigned.
pub type SessionId = u64;

/// Index of a round in the server's round registry.
pub type RoundId = u64;

/// Usable bytes in the payload region.
pub const PAYLOAD_CAPACITY: usize = 1024;

/// Padding appended to the payload region to keep the frame 8-byte aligned.
pub const PAYLOAD_PADDING: usize = 4;

const ID_OFFSET: usize = 0;
const LEN_OFFSET: usize = 8;
const KIND_OFFSET: usize = 16;
const PAYLOAD_OFFSET: usize = 20;

/// Size in bytes of every frame, in both directions.
pub const FRAME_SIZE: usize = PAYLOAD_OFFSET + PAYLOAD_CAPACITY + PAYLOAD_PADDING;

/// Message kind tag carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Terminates the connection.
    Exit = 0,
    /// Asks for (server) or supplies (client) the password.
    EnterPassword = 1,
    /// The supplied password was wrong.
    WrongPassword = 2,
    /// Carries the newly assigned session id in the envelope.
    AssignId = 3,
    /// Lists the sessions available for a round.
    ShowOpponents = 4,
    /// Requests (client) or announces (server) a new round.
    SelectOpponent = 5,
    /// Reserved, never sent.
    AskOpponent = 6,
    /// A guess from the guesser.
    Guess = 7,
    /// The last guess did not match the secret word.
    WrongGuess = 8,
    /// A hint from the chooser to the guesser.
    Hint = 9,
    /// The last guess matched the secret word.
    CorrectGuess = 10,
}

impl TryFrom<u32> for MessageKind {
    type Error = ProtocolError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => MessageKind::Exit,
            1 => MessageKind::EnterPassword,
            2 => MessageKind::WrongPassword,
            3 => MessageKind::AssignId,
            4 => MessageKind::ShowOpponents,
            5 => MessageKind::SelectOpponent,
            6 => MessageKind::AskOpponent,
            7 => MessageKind::Guess,
            8 => MessageKind::WrongGuess,
            9 => MessageKind::Hint,
            10 => MessageKind::CorrectGuess,
            other => return Err(ProtocolError::UnknownKind(other)),
        })
    }
}

/// One message: envelope plus the meaningful part of the payload.
///
/// Frames are plain values. The codec copies them into a fresh buffer for
/// every read and write, so nothing is shared across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender (client to server) or target (server to client).
    pub id: SessionId,
    pub kind: MessageKind,
    payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame, rejecting payloads larger than [`PAYLOAD_CAPACITY`].
    pub fn new(id: SessionId, kind: MessageKind, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > PAYLOAD_CAPACITY {
            return Err(ProtocolError::PayloadTooLarge {
                len: payload.len(),
                capacity: PAYLOAD_CAPACITY,
            });
        }

        Ok(Self {
            id,
            kind,
            payload: payload.to_vec(),
        })
    }

    /// Builds a frame with no payload.
    pub fn empty(id: SessionId, kind: MessageKind) -> Self {
        Self {
            id,
            kind,
            payload: Vec::new(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Lays the frame out in its fixed wire form.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];

        bytes[ID_OFFSET..LEN_OFFSET].copy_from_slice(&self.id.to_ne_bytes());
        bytes[LEN_OFFSET..KIND_OFFSET].copy_from_slice(&(self.payload.len() as u64).to_ne_bytes());
        bytes[KIND_OFFSET..PAYLOAD_OFFSET].copy_from_slice(&(self.kind as u32).to_ne_bytes());
        bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + self.payload.len()].copy_from_slice(&self.payload);

        bytes
    }

    /// Parses a frame from its fixed wire form.
    pub fn decode(bytes: &[u8; FRAME_SIZE]) -> Result<Self, ProtocolError> {
        let id = u64::from_ne_bytes(read_array(bytes, ID_OFFSET));
        let len = u64::from_ne_bytes(read_array(bytes, LEN_OFFSET));
        let tag = u32::from_ne_bytes(read_array(bytes, KIND_OFFSET));

        let kind = MessageKind::try_from(tag)?;
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > PAYLOAD_CAPACITY {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                capacity: PAYLOAD_CAPACITY,
            });
        }

        Ok(Self {
            id,
            kind,
            payload: bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + len].to_vec(),
        })
    }
}

fn read_array<const N: usize>(bytes: &[u8; FRAME_SIZE], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_is_aligned() {
        assert_eq!(FRAME_SIZE, 1048);
        assert_eq!(FRAME_SIZE % 8, 0);
    }

    #[test]
    fn test_kind_tags_match_wire_values() {
        assert_eq!(MessageKind::Exit as u32, 0);
        assert_eq!(MessageKind::AssignId as u32, 3);
        assert_eq!(MessageKind::CorrectGuess as u32, 10);

        for tag in 0..=10 {
            let kind = MessageKind::try_from(tag).unwrap();
            assert_eq!(kind as u32, tag);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        match MessageKind::try_from(11) {
            Err(ProtocolError::UnknownKind(11)) => {}
            other => panic!("Expected unknown kind error, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_new_rejects_oversized_payload() {
        let payload = vec![1u8; PAYLOAD_CAPACITY + 1];
        assert!(Frame::new(1, MessageKind::Hint, &payload).is_err());

        let payload = vec![1u8; PAYLOAD_CAPACITY];
        let frame = Frame::new(1, MessageKind::Hint, &payload).unwrap();
        assert_eq!(frame.payload_len(), PAYLOAD_CAPACITY);
    }

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(7, MessageKind::EnterPassword, b"secret").unwrap();
        let bytes = frame.encode();

        assert_eq!(&bytes[0..8], &7u64.to_ne_bytes());
        assert_eq!(&bytes[8..16], &6u64.to_ne_bytes());
        assert_eq!(&bytes[16..20], &1u32.to_ne_bytes());
        assert_eq!(&bytes[20..26], b"secret");
        assert!(bytes[26..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_restores_envelope_and_payload() {
        let frame = Frame::new(3, MessageKind::Guess, b"apple").unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();

        assert_eq!(decoded, frame);
        assert_eq!(decoded.payload(), b"apple");
    }

    #[test]
    fn test_decode_ignores_bytes_past_payload_len() {
        let mut bytes = Frame::new(2, MessageKind::Hint, b"ab").unwrap().encode();
        bytes[30] = 0xff;

        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.payload(), b"ab");
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let mut bytes = Frame::empty(1, MessageKind::Exit).encode();
        bytes[8..16].copy_from_slice(&((PAYLOAD_CAPACITY + 1) as u64).to_ne_bytes());

        match Frame::decode(&bytes) {
            Err(ProtocolError::PayloadTooLarge { len, .. }) => {
                assert_eq!(len, PAYLOAD_CAPACITY + 1)
            }
            other => panic!("Expected payload length error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_kind() {
        let mut bytes = Frame::empty(1, MessageKind::Exit).encode();
        bytes[16..20].copy_from_slice(&99u32.to_ne_bytes());

        assert!(matches!(
            Frame::decode(&bytes),
            Err(ProtocolError::UnknownKind(99))
        ));
    }
}
