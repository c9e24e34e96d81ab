//! Connection transport over TCP or a Unix domain socket.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// Longest usable Unix socket path in bytes (`sun_path` minus the terminator).
pub const MAX_UNIX_PATH_LEN: usize = 107;

/// Default Unix socket path.
pub const DEFAULT_UNIX_SOCKET_PATH: &str = "/tmp/guessing-game-unix-socket";

/// Read side of a connection.
pub type FrameReader = Box<dyn AsyncRead + Send + Unpin>;
/// Write side of a connection.
pub type FrameWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where to listen or connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    #[cfg(unix)]
    Unix { path: PathBuf },
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Unix socket endpoint, rejecting paths that do not fit in `sun_path`.
    #[cfg(unix)]
    pub fn unix(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let len = path.as_os_str().len();
        if len == 0 || len > MAX_UNIX_PATH_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "unix socket path must be 1..={} bytes, got {}",
                    MAX_UNIX_PATH_LEN, len
                ),
            ));
        }
        Ok(Endpoint::Unix { path })
    }

    /// Binds a listening endpoint.
    pub async fn bind(&self) -> io::Result<Listener> {
        match self {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port)).await?;
                Ok(Listener::Tcp(listener))
            }
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                let listener = UnixListener::bind(path)?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
        }
    }

    /// Opens a connection to a listening endpoint.
    pub async fn connect(&self) -> io::Result<Connection> {
        match self {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                Ok(Connection::from_tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                let stream = UnixStream::connect(path).await?;
                Ok(Connection::from_unix(stream, path.display().to_string()))
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            #[cfg(unix)]
            Endpoint::Unix { path } => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A bound, listening endpoint.
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl Listener {
    /// Waits for the next incoming connection.
    pub async fn accept(&self) -> io::Result<Connection> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Connection::from_tcp(stream))
            }
            #[cfg(unix)]
            Listener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                Ok(Connection::from_unix(stream, path.display().to_string()))
            }
        }
    }

    /// The endpoint clients should connect to. For TCP this carries the port
    /// actually bound, which matters when binding port 0.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            Listener::Tcp(listener) => {
                let addr: SocketAddr = listener.local_addr()?;
                Ok(Endpoint::tcp(addr.ip().to_string(), addr.port()))
            }
            #[cfg(unix)]
            Listener::Unix { path, .. } => Ok(Endpoint::Unix { path: path.clone() }),
        }
    }

    /// Removes the socket file of a Unix listener. No-op for TCP.
    pub fn cleanup(&self) {
        match self {
            Listener::Tcp(_) => {}
            #[cfg(unix)]
            Listener::Unix { path, .. } => match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed socket file {}", path.display()),
                Err(e) => warn!("Failed to remove socket file {}: {}", path.display(), e),
            },
        }
    }
}

/// An established, non-blocking connection split into its two directions.
pub struct Connection {
    pub reader: FrameReader,
    pub writer: FrameWriter,
    pub peer: String,
}

impl Connection {
    pub fn new(reader: FrameReader, writer: FrameWriter, peer: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            peer: peer.into(),
        }
    }

    fn from_tcp(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let (reader, writer) = stream.into_split();
        Self::new(Box::new(reader), Box::new(writer), peer)
    }

    #[cfg(unix)]
    fn from_unix(stream: UnixStream, peer: String) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(Box::new(reader), Box::new(writer), peer)
    }

    /// In-memory connection pair, used by tests.
    pub fn pair(buffer: usize) -> (Connection, Connection) {
        let (a, b) = tokio::io::duplex(buffer);
        let (a_reader, a_writer) = tokio::io::split(a);
        let (b_reader, b_writer) = tokio::io::split(b);
        (
            Connection::new(Box::new(a_reader), Box::new(a_writer), "memory-a"),
            Connection::new(Box::new(b_reader), Box::new(b_writer), "memory-b"),
        )
    }

    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_frame, write_frame, WaitPolicy};
    use crate::frame::{Frame, MessageKind};

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::tcp("127.0.0.1", 8080).to_string(), "tcp://127.0.0.1:8080");
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_path_length_limit() {
        let ok = "/tmp/".to_string() + &"a".repeat(MAX_UNIX_PATH_LEN - 5);
        assert!(Endpoint::unix(ok).is_ok());

        let too_long = "/tmp/".to_string() + &"a".repeat(MAX_UNIX_PATH_LEN - 4);
        assert!(Endpoint::unix(too_long).is_err());

        assert!(Endpoint::unix("").is_err());
    }

    #[tokio::test]
    async fn test_tcp_bind_and_connect() {
        let listener = Endpoint::tcp("127.0.0.1", 0).bind().await.unwrap();
        let endpoint = listener.local_endpoint().unwrap();

        let client = tokio::spawn(async move {
            let mut conn = endpoint.connect().await.unwrap();
            let frame = Frame::new(0, MessageKind::EnterPassword, b"pw").unwrap();
            write_frame(&mut conn.writer, &frame, WaitPolicy::default())
                .await
                .unwrap();
        });

        let mut conn = listener.accept().await.unwrap();
        let frame = read_frame(&mut conn.reader, WaitPolicy::default())
            .await
            .unwrap();
        assert_eq!(frame.payload(), b"pw");

        client.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_bind_connect_and_cleanup() {
        let path = std::env::temp_dir().join(format!("gg-transport-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let listener = Endpoint::unix(&path).unwrap().bind().await.unwrap();
        let endpoint = listener.local_endpoint().unwrap();

        let mut client = endpoint.connect().await.unwrap();
        let mut server = listener.accept().await.unwrap();

        write_frame(
            &mut client.writer,
            &Frame::empty(3, MessageKind::Exit),
            WaitPolicy::default(),
        )
        .await
        .unwrap();
        let frame = read_frame(&mut server.reader, WaitPolicy::default())
            .await
            .unwrap();
        assert_eq!(frame.id, 3);
        assert_eq!(frame.kind, MessageKind::Exit);

        listener.cleanup();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_memory_pair() {
        let (mut a, mut b) = Connection::pair(4096);

        write_frame(
            &mut a.writer,
            &Frame::empty(9, MessageKind::CorrectGuess),
            WaitPolicy::NoWait,
        )
        .await
        .unwrap();

        let frame = read_frame(&mut b.reader, WaitPolicy::default())
            .await
            .unwrap();
        assert_eq!(frame.kind, MessageKind::CorrectGuess);
    }
}
