//! Readiness-gated frame reads and writes.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::ProtocolError;
use crate::frame::{Frame, FRAME_SIZE};

/// Timeout used for request/response exchanges such as authentication.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// How long a read or write may wait for the transport to become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Make a single attempt and fail if the transport is not ready.
    NoWait,
    /// Wait as long as it takes.
    Block,
    /// Wait up to the given duration.
    Timeout(Duration),
}

impl WaitPolicy {
    fn limit(self) -> Option<Duration> {
        match self {
            WaitPolicy::NoWait => Some(Duration::ZERO),
            WaitPolicy::Block => None,
            WaitPolicy::Timeout(limit) => Some(limit),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Timeout(DEFAULT_TIMEOUT)
    }
}

/// Writes one full frame.
///
/// `policy` bounds the wait for the transport to take the first byte. If it
/// takes nothing in time the call fails with
/// [`ProtocolError::WriteUnavailable`] and the stream is untouched. Once part
/// of the frame is out, the rest gets the same limit again; running out then
/// yields [`ProtocolError::Truncated`], after which the stream can no longer
/// carry frames and must be closed.
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &Frame,
    policy: WaitPolicy,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = frame.encode();
    let limit = policy.limit();

    let written = match limit {
        Some(limit) => timeout(limit, writer.write(&bytes))
            .await
            .map_err(|_| ProtocolError::WriteUnavailable)?,
        None => writer.write(&bytes).await,
    }
    .map_err(write_error)?;

    if written == 0 {
        return Err(ProtocolError::Closed);
    }

    let rest = async {
        writer.write_all(&bytes[written..]).await?;
        writer.flush().await
    };

    match limit {
        Some(limit) => timeout(limit, rest)
            .await
            .map_err(|_| ProtocolError::Truncated { written })?,
        None => rest.await,
    }
    .map_err(write_error)
}

fn write_error(e: std::io::Error) -> ProtocolError {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::WriteZero => {
            ProtocolError::Closed
        }
        _ => ProtocolError::Io(e),
    }
}

/// Reads one full frame into a fresh buffer and decodes it.
///
/// A peer that closes the connection yields [`ProtocolError::Closed`]; a
/// transport that stays silent past `policy` yields
/// [`ProtocolError::ReadUnavailable`].
pub async fn read_frame<R>(reader: &mut R, policy: WaitPolicy) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = [0u8; FRAME_SIZE];

    let result = match policy.limit() {
        Some(limit) => timeout(limit, reader.read_exact(&mut buffer))
            .await
            .map_err(|_| ProtocolError::ReadUnavailable)?,
        None => reader.read_exact(&mut buffer).await,
    };

    match result {
        Ok(_) => Frame::decode(&buffer),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ProtocolError::Closed),
        Err(e) if e.kind() == ErrorKind::ConnectionReset => Err(ProtocolError::Closed),
        Err(e) => Err(ProtocolError::Io(e)),
    }
}
