use crate::game::{Action, ClientEvent, ClientGame};
use crate::input;
use log::{debug, info, warn};
use shared::{
    read_frame, write_frame, Connection, Endpoint, Frame, FrameReader, FrameWriter, MessageKind,
    ProtocolError, SessionId, WaitPolicy,
};
use std::io::BufReader;
use tokio::sync::mpsc;

pub struct Client {
    id: SessionId,
    reader: FrameReader,
    writer: FrameWriter,
    policy: WaitPolicy,
}

impl Client {
    /// Connects to a server and authenticates with `password`
    pub async fn connect(endpoint: &Endpoint, password: &str) -> Result<Self, ProtocolError> {
        info!("Connecting to {}...", endpoint);
        let connection = endpoint.connect().await?;
        Self::handshake(connection, password, WaitPolicy::default()).await
    }

    /// Answers the password challenge on an open connection
    ///
    /// A `wrong_password` reply becomes [`ProtocolError::Rejected`].
    pub async fn handshake(
        connection: Connection,
        password: &str,
        policy: WaitPolicy,
    ) -> Result<Self, ProtocolError> {
        let (mut reader, mut writer) = connection.into_split();

        let challenge = read_frame(&mut reader, policy).await?;
        if challenge.kind != MessageKind::EnterPassword {
            return Err(ProtocolError::UnexpectedKind {
                expected: MessageKind::EnterPassword,
                got: challenge.kind,
            });
        }

        let answer = Frame::new(0, MessageKind::EnterPassword, password.as_bytes())?;
        write_frame(&mut writer, &answer, policy).await?;

        let reply = read_frame(&mut reader, policy).await?;
        match reply.kind {
            MessageKind::AssignId => {
                info!("Connected! Client ID: {}", reply.id);
                Ok(Client {
                    id: reply.id,
                    reader,
                    writer,
                    policy,
                })
            }
            MessageKind::WrongPassword => Err(ProtocolError::Rejected),
            other => Err(ProtocolError::UnexpectedKind {
                expected: MessageKind::AssignId,
                got: other,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Plays until the game ends, the server goes away or Ctrl+C
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        input::spawn_line_listener(BufReader::new(std::io::stdin()), events_tx.clone())?;

        let interrupt_tx = events_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = interrupt_tx.send(ClientEvent::Interrupt);
            }
        });

        self.process(events_tx, events_rx).await
    }

    /// Feeds socket frames and queued events through the state machine
    ///
    /// Returns once the state machine asks to exit or every event source is
    /// gone.
    pub async fn process(
        self,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
        mut events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Client {
            id,
            reader,
            mut writer,
            policy,
        } = self;

        let lost_tx = events_tx.clone();
        let receiver = spawn_frame_listener(reader, events_tx);
        let mut game = ClientGame::new(id);
        let mut link_lost = false;

        while let Some(event) = events_rx.recv().await {
            for action in game.handle(event) {
                match action {
                    Action::Send(frame) if link_lost => {
                        debug!("Not sending {:?}, connection is gone", frame.kind);
                    }
                    Action::Send(frame) => match write_frame(&mut writer, &frame, policy).await {
                        Ok(()) => {}
                        Err(e) if e.is_write_skipped() => {
                            warn!("Server is not reading, dropped {:?}", frame.kind);
                        }
                        Err(e) => {
                            warn!("Failed to send {:?}: {}", frame.kind, e);
                            link_lost = true;
                            let _ = lost_tx.send(ClientEvent::Disconnected);
                        }
                    },
                    Action::Print(line) => println!("{}", line),
                    Action::Exit => {
                        receiver.abort();
                        return Ok(());
                    }
                }
            }
        }

        receiver.abort();
        Ok(())
    }
}

/// Spawns task that pushes every frame from the server onto the event queue
fn spawn_frame_listener(
    mut reader: FrameReader,
    events: mpsc::UnboundedSender<ClientEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader, WaitPolicy::Block).await {
                Ok(frame) => {
                    if events.send(ClientEvent::Frame(frame)).is_err() {
                        break;
                    }
                }
                Err(e) if e.is_malformed() => warn!("Dropping malformed frame: {}", e),
                Err(e) => {
                    debug!("Server connection ended: {}", e);
                    let _ = events.send(ClientEvent::Disconnected);
                    break;
                }
            }
        }
    })
}
