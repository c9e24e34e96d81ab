//! Client-side game flow as a state machine over queued events
//!
//! The state machine never touches the socket or the console. It consumes one
//! [`ClientEvent`] at a time and returns the [`Action`]s the network loop must
//! perform, so whichever of socket and keyboard produces an event first wins.

use log::{debug, warn};
use shared::{
    Frame, MessageKind, OpponentList, PayloadRecord, RoundRecord, SessionId, WORD_CAPACITY,
};

/// Shortest word accepted as a secret, guess or hint
pub const MIN_WORD_LEN: usize = 2;

/// Everything the client reacts to, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A frame from the server
    Frame(Frame),
    /// One line typed by the player, without its line terminator
    Input(String),
    /// Standard input reached end of file
    InputClosed,
    /// The connection to the server failed or was closed
    Disconnected,
    /// Ctrl+C
    Interrupt,
}

/// What the network loop must do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(Frame),
    Print(String),
    Exit,
}

/// Which side of a round this player is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Chooser,
    Guesser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// Waiting for the server to announce opponents
    Idle,
    /// Opponent list shown, waiting for an id
    ChoosingOpponent { opponents: Vec<SessionId> },
    /// Opponent picked, waiting for the secret word
    EnteringWord {
        opponent: SessionId,
        opponents: Vec<SessionId>,
    },
    /// Round request sent, waiting for the server to start it
    ///
    /// The server answers a refused request with silence, so typing another
    /// id from the last list starts a new choice.
    AwaitingRound { opponents: Vec<SessionId> },
    InRound { role: Role, record: RoundRecord },
    Finished,
}

/// Per-connection client state
pub struct ClientGame {
    id: SessionId,
    phase: Phase,
}

impl ClientGame {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            phase: Phase::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Role in the current round, if one is running
    pub fn role(&self) -> Option<Role> {
        match &self.phase {
            Phase::InRound { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Advances the state machine by one event
    pub fn handle(&mut self, event: ClientEvent) -> Vec<Action> {
        if self.is_finished() {
            return Vec::new();
        }

        match event {
            ClientEvent::Frame(frame) => self.handle_frame(&frame),
            ClientEvent::Input(line) => self.handle_input(line.trim()),
            ClientEvent::InputClosed | ClientEvent::Interrupt => self.quit("Connection closed."),
            ClientEvent::Disconnected => {
                self.phase = Phase::Finished;
                vec![
                    Action::Print("Connection to the server was lost.".to_string()),
                    Action::Exit,
                ]
            }
        }
    }

    fn handle_frame(&mut self, frame: &Frame) -> Vec<Action> {
        match frame.kind {
            MessageKind::ShowOpponents => self.show_opponents(frame),
            MessageKind::SelectOpponent => self.start_round(frame),
            MessageKind::WrongGuess => self.wrong_guess(frame),
            MessageKind::Hint => self.hint(frame),
            MessageKind::CorrectGuess => self.correct_guess(),
            MessageKind::Exit => {
                self.phase = Phase::Finished;
                vec![
                    Action::Print("The server closed the game.".to_string()),
                    Action::Exit,
                ]
            }
            other => {
                debug!("Ignoring {:?} from server", other);
                Vec::new()
            }
        }
    }

    /// A fresh list replaces whatever selection was in progress
    fn show_opponents(&mut self, frame: &Frame) -> Vec<Action> {
        if matches!(self.phase, Phase::InRound { .. }) {
            return Vec::new();
        }

        let list = match OpponentList::from_frame(frame) {
            Ok(list) => list,
            Err(e) => {
                warn!("Invalid opponent list: {}", e);
                return Vec::new();
            }
        };

        let opponents = list.excluding(self.id);
        if opponents.is_empty() {
            self.phase = Phase::Idle;
            return Vec::new();
        }

        let mut actions = vec![Action::Print("Available opponents:".to_string())];
        actions.extend(
            opponents
                .iter()
                .map(|id| Action::Print(format!("  player {}", id))),
        );
        actions.push(Action::Print("Choose an opponent id:".to_string()));

        self.phase = Phase::ChoosingOpponent { opponents };
        actions
    }

    fn start_round(&mut self, frame: &Frame) -> Vec<Action> {
        let record = match RoundRecord::from_frame(frame) {
            Ok(record) => record,
            Err(e) => {
                warn!("Invalid round announcement: {}", e);
                return Vec::new();
            }
        };

        let (role, message) = if record.chooser == self.id {
            (
                Role::Chooser,
                format!(
                    "Round started! Player {} is guessing your word. Type hints for them:",
                    record.guesser
                ),
            )
        } else if record.guesser == self.id {
            (
                Role::Guesser,
                format!(
                    "Round started! Player {} picked a word. Type your guesses:",
                    record.chooser
                ),
            )
        } else {
            debug!("Ignoring round {} between other players", record.id);
            return Vec::new();
        };

        self.phase = Phase::InRound { role, record };
        vec![Action::Print(message)]
    }

    fn wrong_guess(&mut self, frame: &Frame) -> Vec<Action> {
        let role = match self.role() {
            Some(role) => role,
            None => return Vec::new(),
        };

        match RoundRecord::from_frame(frame) {
            Ok(record) => match role {
                Role::Guesser => vec![Action::Print("Wrong guess!".to_string())],
                Role::Chooser => vec![Action::Print(format!(
                    "Opponent guessed wrong: {}",
                    record.word
                ))],
            },
            Err(e) => {
                warn!("Invalid wrong guess reply: {}", e);
                Vec::new()
            }
        }
    }

    fn hint(&mut self, frame: &Frame) -> Vec<Action> {
        if self.role() != Some(Role::Guesser) {
            return Vec::new();
        }

        match RoundRecord::from_frame(frame) {
            Ok(record) => vec![Action::Print(format!("Hint: {}", record.word))],
            Err(e) => {
                warn!("Invalid hint: {}", e);
                Vec::new()
            }
        }
    }

    fn correct_guess(&mut self) -> Vec<Action> {
        let message = match self.role() {
            Some(Role::Guesser) => "You guessed the word!",
            Some(Role::Chooser) => "Your opponent guessed the word!",
            None => return Vec::new(),
        };

        let mut actions = vec![Action::Print(message.to_string())];
        actions.extend(self.quit("Game over."));
        actions
    }

    fn handle_input(&mut self, line: &str) -> Vec<Action> {
        match self.phase.clone() {
            Phase::Idle => vec![Action::Print(
                "Waiting for the server, please hold on.".to_string(),
            )],
            Phase::ChoosingOpponent { opponents } | Phase::AwaitingRound { opponents } => {
                self.choose_opponent(line, &opponents)
            }
            Phase::EnteringWord {
                opponent,
                opponents,
            } => self.submit_secret(line, opponent, opponents),
            Phase::InRound { role, record } => self.submit_word(line, role, &record),
            Phase::Finished => Vec::new(),
        }
    }

    fn choose_opponent(&mut self, line: &str, opponents: &[SessionId]) -> Vec<Action> {
        let opponent = match line.parse::<SessionId>() {
            Ok(id) => id,
            Err(_) => return reprompt("Not a valid id. Choose an opponent id:"),
        };

        if opponent == self.id {
            return reprompt("You cannot play against yourself. Choose an opponent id:");
        }
        if !opponents.contains(&opponent) {
            return reprompt("No such opponent. Choose an opponent id:");
        }

        self.phase = Phase::EnteringWord {
            opponent,
            opponents: opponents.to_vec(),
        };
        reprompt(&format!(
            "Enter the secret word (at least {} characters, at most {} bytes):",
            MIN_WORD_LEN, WORD_CAPACITY
        ))
    }

    fn submit_secret(
        &mut self,
        word: &str,
        opponent: SessionId,
        opponents: Vec<SessionId>,
    ) -> Vec<Action> {
        if let Some(problem) = check_word(word) {
            return reprompt(&format!("{} Enter the secret word:", problem));
        }

        let request = RoundRecord::new(0, opponent, self.id, word);
        match request.to_frame(self.id, MessageKind::SelectOpponent) {
            Ok(frame) => {
                self.phase = Phase::AwaitingRound { opponents };
                vec![
                    Action::Send(frame),
                    Action::Print(format!("Challenging player {}...", opponent)),
                    Action::Print(
                        "If the round does not start, type another opponent id.".to_string(),
                    ),
                ]
            }
            Err(e) => reprompt(&format!("Could not send that word ({}).", e)),
        }
    }

    fn submit_word(&mut self, word: &str, role: Role, record: &RoundRecord) -> Vec<Action> {
        if let Some(problem) = check_word(word) {
            return reprompt(problem);
        }

        let kind = match role {
            Role::Guesser => MessageKind::Guess,
            Role::Chooser => MessageKind::Hint,
        };
        match record.with_word(word).to_frame(self.id, kind) {
            Ok(frame) => vec![Action::Send(frame)],
            Err(e) => reprompt(&format!("Could not send that word ({}).", e)),
        }
    }

    /// Tells the server this player is leaving, then stops
    fn quit(&mut self, message: &str) -> Vec<Action> {
        self.phase = Phase::Finished;
        vec![
            Action::Send(Frame::empty(self.id, MessageKind::Exit)),
            Action::Print(message.to_string()),
            Action::Exit,
        ]
    }
}

fn reprompt(message: &str) -> Vec<Action> {
    vec![Action::Print(message.to_string())]
}

/// Problem with a typed word, if any
fn check_word(word: &str) -> Option<&'static str> {
    if word.chars().count() < MIN_WORD_LEN {
        Some("Please enter at least 2 characters.")
    } else if word.len() > WORD_CAPACITY {
        Some("That word is too long.")
    } else {
        None
    }
}
