//! Server network layer driving the dispatcher over real connections

use crate::dispatcher::{Dispatcher, Outbound};
use crate::sessions::AuthFailure;
use log::{debug, error, info, warn};
use shared::{
    read_frame, write_frame, Connection, Endpoint, Frame, FrameReader, FrameWriter, Listener,
    SessionId, WaitPolicy, DEFAULT_TIMEOUT, MAX_OPPONENTS,
};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Settings for one server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where to listen
    pub endpoint: Endpoint,
    /// Password every client must supply, compared byte for byte
    pub password: String,
    /// Sessions admitted over the process lifetime
    pub max_sessions: usize,
    /// How long a new connection has to answer the password challenge
    pub auth_timeout: Duration,
    /// How long a single outgoing frame may take
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::tcp("127.0.0.1", 8080),
            password: String::from("secret"),
            max_sessions: 10,
            auth_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Rejects settings the server cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        if self.max_sessions == 0 || self.max_sessions > MAX_OPPONENTS {
            return Err(format!(
                "max clients must be between 1 and {}, got {}",
                MAX_OPPONENTS, self.max_sessions
            ));
        }
        Ok(())
    }
}

/// Messages sent from connection reader tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    FrameReceived { session_id: SessionId, frame: Frame },
    Disconnected { session_id: SessionId },
}

/// Server-side handle of an authenticated connection
///
/// Dropping the peer closes the write side and stops its reader task.
pub struct Peer {
    writer: FrameWriter,
    reader_task: Option<JoinHandle<()>>,
}

impl Peer {
    fn new(writer: FrameWriter) -> Self {
        Self {
            writer,
            reader_task: None,
        }
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

/// Guessing game server
///
/// All session and round state lives in the dispatcher and is only touched
/// from [`Server::run_until`]. Reader tasks forward frames over a channel;
/// writes happen inline on the loop.
pub struct Server {
    listener: Listener,
    config: ServerConfig,
    dispatcher: Dispatcher<Peer>,
    limit_reported: bool,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let listener = config.endpoint.bind().await?;
        info!("Server listening on {}", config.endpoint);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            dispatcher: Dispatcher::new(config.max_sessions),
            config,
            limit_reported: false,
            server_tx,
            server_rx,
        })
    }

    /// Endpoint clients should connect to
    pub fn local_endpoint(&self) -> std::io::Result<Endpoint> {
        self.listener.local_endpoint()
    }

    /// Runs until Ctrl+C
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Main server loop, exits once `shutdown` completes
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Server started successfully");

        loop {
            let accepting = !self.dispatcher.sessions().is_full();

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                },

                // New connections, only while slots remain
                accepted = self.listener.accept(), if accepting => {
                    match accepted {
                        Ok(connection) => {
                            self.authenticate(connection).await;
                            self.report_capacity();
                        }
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                },

                // Frames and disconnects from authenticated sessions
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Runs the password exchange for a freshly accepted connection
    ///
    /// Other sessions wait while this runs; the exchange is bounded by the
    /// authentication timeout.
    async fn authenticate(&mut self, connection: Connection) {
        let peer_name = connection.peer.clone();
        let (mut reader, mut writer) = connection.into_split();
        let policy = WaitPolicy::Timeout(self.config.auth_timeout);

        debug!("Challenging new connection from {}", peer_name);
        if let Err(e) = write_frame(&mut writer, &Dispatcher::<Peer>::challenge(), policy).await {
            warn!("Failed to challenge {}: {}", peer_name, e);
            return;
        }

        let response = match read_frame(&mut reader, policy).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("No password from {}: {}", peer_name, e);
                reject(&mut writer, policy).await;
                return;
            }
        };

        let password = self.config.password.clone();
        match self
            .dispatcher
            .admit(Peer::new(writer), &response, password.as_bytes())
        {
            Ok((session_id, outbound)) => {
                let reader_task = spawn_reader(session_id, reader, self.server_tx.clone());
                if let Some(peer) = self.dispatcher.sessions_mut().transport_mut(session_id) {
                    peer.reader_task = Some(reader_task);
                }
                self.deliver(outbound).await;
            }
            Err(AuthFailure::WrongPassword(mut peer)) => {
                info!("Wrong password from {}", peer_name);
                reject(&mut peer.writer, policy).await;
            }
            Err(AuthFailure::ServerFull(mut peer)) => {
                warn!("Refusing {}: server is full", peer_name);
                reject(&mut peer.writer, policy).await;
            }
        }
    }

    fn report_capacity(&mut self) {
        if self.dispatcher.sessions().is_full() && !self.limit_reported {
            self.limit_reported = true;
            warn!("Server cannot accept more users. Limit has been reached!");
        }
    }

    async fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::FrameReceived { session_id, frame } => {
                let outbound = self.dispatcher.handle_frame(session_id, &frame);
                self.deliver(outbound).await;
            }
            ServerMessage::Disconnected { session_id } => {
                if self.dispatcher.disconnect(session_id) {
                    debug!("User {} closed the connection", session_id);
                }
            }
        }
    }

    /// Writes each frame to its target
    ///
    /// A frame the target would not take at all is dropped. Any other failure
    /// leaves the stream unusable, so the target is disconnected.
    async fn deliver(&mut self, outbound: Vec<Outbound>) {
        let policy = WaitPolicy::Timeout(self.config.write_timeout);

        for Outbound { target, frame } in outbound {
            let result = match self.dispatcher.sessions_mut().transport_mut(target) {
                Some(peer) => write_frame(&mut peer.writer, &frame, policy).await,
                None => {
                    debug!("Dropping {:?} for closed user {}", frame.kind, target);
                    continue;
                }
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_write_skipped() => {
                    warn!("User {} is not reading, dropped {:?}", target, frame.kind);
                }
                Err(e) => {
                    warn!("Failed to send {:?} to user {}: {}", frame.kind, target, e);
                    self.dispatcher.disconnect(target);
                }
            }
        }
    }

    /// Best-effort exit notice to every open session, then close everything
    async fn shutdown(&mut self) {
        for Outbound { target, frame } in self.dispatcher.farewell() {
            if let Some(peer) = self.dispatcher.sessions_mut().transport_mut(target) {
                if let Err(e) = write_frame(&mut peer.writer, &frame, WaitPolicy::NoWait).await {
                    debug!("Exit notice to user {} failed: {}", target, e);
                }
            }
        }

        let closed = self.dispatcher.sessions_mut().close_all();
        info!("Closed {} connections", closed.len());
        self.listener.cleanup();
    }
}

/// Tells a connection its password was refused; the connection is dropped after
async fn reject(writer: &mut FrameWriter, policy: WaitPolicy) {
    if let Err(e) = write_frame(writer, &Dispatcher::<Peer>::rejection(), policy).await {
        debug!("Failed to send rejection: {}", e);
    }
}

/// Spawns task that reads frames from one session until it closes
fn spawn_reader(
    session_id: SessionId,
    mut reader: FrameReader,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader, WaitPolicy::Block).await {
                Ok(frame) => {
                    if server_tx
                        .send(ServerMessage::FrameReceived { session_id, frame })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) if e.is_malformed() => {
                    warn!("Dropping malformed frame from user {}: {}", session_id, e);
                }
                Err(e) => {
                    debug!("Reader for user {} stopped: {}", session_id, e);
                    let _ = server_tx.send(ServerMessage::Disconnected { session_id });
                    break;
                }
            }
        }
    })
}
