//! Protocol error types shared by the server and the client.

use std::io;

use thiserror::Error;

use crate::frame::MessageKind;

/// Errors raised while moving frames across a transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// I/O error on the underlying socket.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The transport did not become readable within the wait policy.
    #[error("transport not readable within the wait policy")]
    ReadUnavailable,

    /// The transport did not become writable within the wait policy.
    #[error("transport not writable within the wait policy")]
    WriteUnavailable,

    /// Only the first `written` bytes of a frame went out; the stream is out
    /// of step and must be dropped.
    #[error("frame cut off after {written} bytes")]
    Truncated { written: usize },

    /// The envelope carries a kind tag outside the known set.
    #[error("unknown message kind tag {0}")]
    UnknownKind(u32),

    /// The declared payload length exceeds the payload capacity.
    #[error("payload length {len} exceeds capacity {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    /// The payload bytes do not hold the expected record.
    #[error("malformed payload: {0}")]
    Payload(#[from] bincode::Error),

    /// The payload decoded but failed shape validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The peer answered with a message kind the exchange does not allow.
    #[error("expected {expected:?}, got {got:?}")]
    UnexpectedKind {
        expected: MessageKind,
        got: MessageKind,
    },

    /// The server refused the supplied password.
    #[error("authentication rejected")]
    Rejected,
}

impl ProtocolError {
    /// True when a failed write left nothing on the wire, so the connection
    /// can still carry later frames.
    pub fn is_write_skipped(&self) -> bool {
        matches!(self, ProtocolError::WriteUnavailable)
    }

    /// True when the frame itself was bad but the connection is still usable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnknownKind(_)
                | ProtocolError::PayloadTooLarge { .. }
                | ProtocolError::Payload(_)
                | ProtocolError::InvalidPayload(_)
        )
    }
}
