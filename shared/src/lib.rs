//! Wire protocol shared by the guessing game server and client.
//!
//! - [`frame`]: the fixed-size frame and its message kinds
//! - [`payload`]: typed records serialized into frame payloads
//! - [`codec`]: frame reads and writes gated by a [`WaitPolicy`]
//! - [`transport`]: TCP and Unix domain socket endpoints
//! - [`error`]: the [`ProtocolError`] type

pub mod codec;
pub mod error;
pub mod frame;
pub mod payload;
pub mod transport;

pub use codec::{read_frame, write_frame, WaitPolicy, DEFAULT_TIMEOUT};
pub use error::ProtocolError;
pub use frame::{Frame, MessageKind, RoundId, SessionId, FRAME_SIZE, PAYLOAD_CAPACITY};
pub use payload::{OpponentList, PayloadRecord, RoundRecord, MAX_OPPONENTS, WORD_CAPACITY};
pub use transport::{
    Connection, Endpoint, FrameReader, FrameWriter, Listener, DEFAULT_UNIX_SOCKET_PATH,
    MAX_UNIX_PATH_LEN,
};
