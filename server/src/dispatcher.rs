//! Protocol state machine driving sessions and rounds
//!
//! The dispatcher owns both registries and turns each incoming frame into the
//! frames that must go out. It performs no I/O itself: the network layer
//! feeds it frames one at a time and delivers whatever [`Outbound`] messages
//! come back. Since exactly one caller ever touches the registries, no locking
//! is involved.

use crate::rounds::{Round, RoundRegistry};
use crate::sessions::{AuthFailure, SessionRegistry};
use log::{debug, error, info, warn};
use shared::{Frame, MessageKind, OpponentList, PayloadRecord, RoundRecord, SessionId};

/// A frame addressed to one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub target: SessionId,
    pub frame: Frame,
}

impl Outbound {
    fn new(target: SessionId, frame: Frame) -> Self {
        Self { target, frame }
    }
}

/// Server-side protocol state
pub struct Dispatcher<T> {
    sessions: SessionRegistry<T>,
    rounds: RoundRegistry,
}

impl<T> Dispatcher<T> {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: SessionRegistry::new(max_sessions),
            rounds: RoundRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry<T> {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionRegistry<T> {
        &mut self.sessions
    }

    pub fn rounds(&self) -> &RoundRegistry {
        &self.rounds
    }

    /// Frame asking a fresh connection for the password
    pub fn challenge() -> Frame {
        Frame::empty(0, MessageKind::EnterPassword)
    }

    /// Frame telling a connection its password was refused
    pub fn rejection() -> Frame {
        Frame::empty(0, MessageKind::WrongPassword)
    }

    /// Admits a connection based on its answer to the password challenge
    ///
    /// On success the new session is told its id and every eligible session
    /// receives a fresh opponent list.
    pub fn admit(
        &mut self,
        transport: T,
        response: &Frame,
        password: &[u8],
    ) -> Result<(SessionId, Vec<Outbound>), AuthFailure<T>> {
        if response.kind != MessageKind::EnterPassword {
            return Err(AuthFailure::WrongPassword(transport));
        }

        let id = self
            .sessions
            .authenticate(transport, response.payload(), password)?;

        let mut outbound = vec![Outbound::new(id, Frame::empty(id, MessageKind::AssignId))];
        outbound.extend(self.announce_opponents());

        Ok((id, outbound))
    }

    /// Whether `id` is in an unfinished round
    pub fn is_in_game(&self, id: SessionId) -> bool {
        self.rounds.is_in_game(id)
    }

    /// Sessions neither finished nor in an unfinished round, in id order
    pub fn eligible_opponents(&self) -> Vec<SessionId> {
        self.sessions
            .active_ids()
            .into_iter()
            .filter(|id| !self.is_in_game(*id))
            .collect()
    }

    /// Sends the opponent list to every eligible session
    ///
    /// Nothing is sent while fewer than two sessions are eligible. Each
    /// recipient gets the full list, its own id included.
    pub fn announce_opponents(&self) -> Vec<Outbound> {
        let eligible = self.eligible_opponents();
        if eligible.len() < 2 {
            return Vec::new();
        }

        let list = OpponentList(eligible);
        let mut outbound = Vec::with_capacity(list.ids().len());
        for &id in list.ids() {
            match list.to_frame(id, MessageKind::ShowOpponents) {
                Ok(frame) => outbound.push(Outbound::new(id, frame)),
                Err(e) => {
                    error!("Failed to build opponent list: {}", e);
                    return Vec::new();
                }
            }
        }
        outbound
    }

    /// Processes one frame received from `sender`
    ///
    /// The sender is the session whose connection delivered the frame; the
    /// id written in the envelope is not trusted.
    pub fn handle_frame(&mut self, sender: SessionId, frame: &Frame) -> Vec<Outbound> {
        if self.sessions.is_finished(sender) {
            debug!("Ignoring {:?} from finished user {}", frame.kind, sender);
            return Vec::new();
        }

        match frame.kind {
            MessageKind::SelectOpponent => match RoundRecord::from_frame(frame) {
                Ok(record) => self.select_opponent(sender, &record),
                Err(e) => {
                    warn!("Invalid round request from user {}: {}", sender, e);
                    Vec::new()
                }
            },
            MessageKind::Guess => match RoundRecord::from_frame(frame) {
                Ok(record) => self.guess(sender, &record.word),
                Err(e) => {
                    warn!("Invalid guess from user {}: {}", sender, e);
                    Vec::new()
                }
            },
            MessageKind::Hint => match RoundRecord::from_frame(frame) {
                Ok(record) => self.hint(sender, &record.word),
                Err(e) => {
                    warn!("Invalid hint from user {}: {}", sender, e);
                    Vec::new()
                }
            },
            MessageKind::Exit => {
                self.disconnect(sender);
                Vec::new()
            }
            other => {
                debug!("Ignoring {:?} from user {}", other, sender);
                Vec::new()
            }
        }
    }

    /// Starts a round requested by `sender`
    ///
    /// The request is validated before anything is stored: the sender must be
    /// a participant, the participants must differ, and both must be connected
    /// and free. Invalid requests are dropped silently.
    pub fn select_opponent(&mut self, sender: SessionId, request: &RoundRecord) -> Vec<Outbound> {
        let (chooser, guesser) = (request.chooser, request.guesser);

        if sender != chooser && sender != guesser {
            warn!(
                "User {} tried to start a round for {} and {}",
                sender, chooser, guesser
            );
            return Vec::new();
        }
        if chooser == guesser {
            warn!("User {} tried to play against itself", sender);
            return Vec::new();
        }
        if request.word.is_empty() {
            warn!("User {} sent an empty secret word", sender);
            return Vec::new();
        }
        for id in [chooser, guesser] {
            if self.sessions.is_finished(id) || self.is_in_game(id) {
                warn!("User {} is not available for a round", id);
                return Vec::new();
            }
        }

        let round = self.rounds.create(chooser, guesser, &request.word);
        let announcement = round.record().blanked();
        broadcast(round, MessageKind::SelectOpponent, Some(&announcement))
    }

    /// Checks a guess against the sender's round
    ///
    /// A correct guess finishes the round.
    pub fn guess(&mut self, sender: SessionId, word: &str) -> Vec<Outbound> {
        let round = match self.rounds.find_round(sender) {
            Some(round) if round.guesser == sender => round,
            Some(_) => {
                warn!("User {} guessed but is not the guesser", sender);
                return Vec::new();
            }
            None => {
                debug!("User {} guessed outside a round", sender);
                return Vec::new();
            }
        };

        if word.as_bytes() != round.secret_word.as_bytes() {
            debug!("Round {}: wrong guess from user {}", round.id, sender);
            let reply = round.record().with_word(word);
            return broadcast(round, MessageKind::WrongGuess, Some(&reply));
        }

        info!("Round {}: user {} guessed the word", round.id, sender);
        let outbound = broadcast(round, MessageKind::CorrectGuess, None);
        let round_id = round.id;
        self.rounds.finish(round_id);
        outbound
    }

    /// Forwards a hint from the chooser to the guesser only
    pub fn hint(&mut self, sender: SessionId, word: &str) -> Vec<Outbound> {
        match self.rounds.find_round(sender) {
            Some(round) if round.chooser == sender => {
                let hint = round.record().with_word(word);
                match hint.to_frame(round.guesser, MessageKind::Hint) {
                    Ok(frame) => vec![Outbound::new(round.guesser, frame)],
                    Err(e) => {
                        warn!("Failed to forward hint from user {}: {}", sender, e);
                        Vec::new()
                    }
                }
            }
            Some(_) => {
                warn!("User {} hinted but is not the chooser", sender);
                Vec::new()
            }
            None => {
                debug!("User {} hinted outside a round", sender);
                Vec::new()
            }
        }
    }

    /// Finishes a session that quit or whose connection dropped
    ///
    /// Drops the session's transport and finishes its active round, if any.
    /// Returns false if the session was unknown or already finished.
    pub fn disconnect(&mut self, id: SessionId) -> bool {
        if !self.sessions.mark_finished(id) {
            return false;
        }
        info!("User {} quitted", id);

        if let Some(round_id) = self.rounds.find_round(id).map(|round| round.id) {
            self.rounds.finish(round_id);
        }
        true
    }

    /// Exit notices for every session still connected
    pub fn farewell(&self) -> Vec<Outbound> {
        self.sessions
            .active_ids()
            .into_iter()
            .filter_map(|id| {
                Frame::new(id, MessageKind::Exit, b"exit")
                    .ok()
                    .map(|frame| Outbound::new(id, frame))
            })
            .collect()
    }
}

/// Same message to both participants, guesser first
fn broadcast(round: &Round, kind: MessageKind, record: Option<&RoundRecord>) -> Vec<Outbound> {
    let mut outbound = Vec::with_capacity(2);
    for target in [round.guesser, round.chooser] {
        let frame = match record {
            Some(record) => match record.to_frame(target, kind) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to build {:?} for round {}: {}", kind, round.id, e);
                    return Vec::new();
                }
            },
            None => Frame::empty(target, kind),
        };
        outbound.push(Outbound::new(target, frame));
    }
    outbound
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &[u8] = b"secret";

    fn password_frame(password: &[u8]) -> Frame {
        Frame::new(0, MessageKind::EnterPassword, password).unwrap()
    }

    fn dispatcher_with(users: usize) -> Dispatcher<()> {
        let mut dispatcher = Dispatcher::new(10);
        for _ in 0..users {
            dispatcher
                .admit((), &password_frame(PASSWORD), PASSWORD)
                .unwrap();
        }
        dispatcher
    }

    fn round_request(chooser: SessionId, guesser: SessionId, word: &str) -> Frame {
        RoundRecord::new(0, guesser, chooser, word)
            .to_frame(chooser, MessageKind::SelectOpponent)
            .unwrap()
    }

    fn word_frame(sender: SessionId, kind: MessageKind, word: &str) -> Frame {
        RoundRecord::new(0, 0, 0, word).to_frame(sender, kind).unwrap()
    }

    fn targets(outbound: &[Outbound]) -> Vec<SessionId> {
        outbound.iter().map(|o| o.target).collect()
    }

    #[test]
    fn test_first_user_gets_id_without_announcement() {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new(10);

        let (id, outbound) = dispatcher
            .admit((), &password_frame(PASSWORD), PASSWORD)
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].target, 1);
        assert_eq!(outbound[0].frame.kind, MessageKind::AssignId);
        assert_eq!(outbound[0].frame.id, 1);
    }

    #[test]
    fn test_second_user_triggers_announcement() {
        let mut dispatcher = dispatcher_with(1);

        let (id, outbound) = dispatcher
            .admit((), &password_frame(PASSWORD), PASSWORD)
            .unwrap();

        assert_eq!(id, 2);
        assert_eq!(outbound[0].frame.kind, MessageKind::AssignId);

        let announcements = &outbound[1..];
        assert_eq!(targets(announcements), vec![1, 2]);
        for message in announcements {
            assert_eq!(message.frame.kind, MessageKind::ShowOpponents);
            let list = OpponentList::from_frame(&message.frame).unwrap();
            assert_eq!(list.ids(), &[1, 2]);
        }
    }

    #[test]
    fn test_wrong_password_rejected() {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new(10);

        for attempt in [&b"secre"[..], b"secret2", b"SECRET", b""] {
            let result = dispatcher.admit((), &password_frame(attempt), PASSWORD);
            assert!(matches!(result, Err(AuthFailure::WrongPassword(()))));
        }
        assert!(dispatcher.sessions().is_empty());

        let (id, _) = dispatcher
            .admit((), &password_frame(PASSWORD), PASSWORD)
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_password_must_arrive_as_enter_password() {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new(10);
        let frame = Frame::new(0, MessageKind::Guess, PASSWORD).unwrap();

        assert!(dispatcher.admit((), &frame, PASSWORD).is_err());
    }

    #[test]
    fn test_announcement_lists_every_eligible_user() {
        let dispatcher = dispatcher_with(4);

        let outbound = dispatcher.announce_opponents();
        assert_eq!(targets(&outbound), vec![1, 2, 3, 4]);
        for message in &outbound {
            let list = OpponentList::from_frame(&message.frame).unwrap();
            assert_eq!(list.ids(), &[1, 2, 3, 4]);
            assert_eq!(message.frame.id, message.target);
        }
    }

    #[test]
    fn test_announcement_skips_busy_and_finished_users() {
        let mut dispatcher = dispatcher_with(5);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));
        dispatcher.handle_frame(3, &Frame::empty(3, MessageKind::Exit));

        assert_eq!(dispatcher.eligible_opponents(), vec![4, 5]);
        assert_eq!(targets(&dispatcher.announce_opponents()), vec![4, 5]);

        dispatcher.handle_frame(4, &Frame::empty(4, MessageKind::Exit));
        assert!(dispatcher.announce_opponents().is_empty());
    }

    #[test]
    fn test_select_opponent_starts_round_with_blanked_word() {
        let mut dispatcher = dispatcher_with(2);

        let outbound = dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        assert_eq!(targets(&outbound), vec![2, 1]);
        for message in &outbound {
            assert_eq!(message.frame.kind, MessageKind::SelectOpponent);
            let record = RoundRecord::from_frame(&message.frame).unwrap();
            assert_eq!(record.id, 0);
            assert_eq!(record.chooser, 1);
            assert_eq!(record.guesser, 2);
            assert!(record.word.is_empty());
        }

        let round = dispatcher.rounds().find_round(1).unwrap();
        assert_eq!(round.secret_word, "apple");
        assert_eq!(dispatcher.rounds().find_round(2).unwrap().id, round.id);
        assert!(dispatcher.rounds().find_round(3).is_none());
    }

    #[test]
    fn test_unauthorized_select_stores_nothing() {
        let mut dispatcher = dispatcher_with(3);

        let outbound = dispatcher.handle_frame(3, &round_request(1, 2, "apple"));

        assert!(outbound.is_empty());
        assert!(dispatcher.rounds().is_empty());
    }

    #[test]
    fn test_select_rejects_self_busy_and_unknown_opponents() {
        let mut dispatcher = dispatcher_with(3);

        assert!(dispatcher
            .handle_frame(1, &round_request(1, 1, "apple"))
            .is_empty());
        assert!(dispatcher
            .handle_frame(1, &round_request(1, 9, "apple"))
            .is_empty());
        assert!(dispatcher.handle_frame(1, &round_request(1, 2, "")).is_empty());

        assert_eq!(dispatcher.handle_frame(1, &round_request(1, 2, "apple")).len(), 2);
        assert!(dispatcher
            .handle_frame(3, &round_request(3, 2, "pear"))
            .is_empty());
        assert_eq!(dispatcher.rounds().len(), 1);
    }

    #[test]
    fn test_wrong_guess_goes_to_both_with_attempt() {
        let mut dispatcher = dispatcher_with(2);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        let outbound = dispatcher.handle_frame(2, &word_frame(2, MessageKind::Guess, "Apple"));

        assert_eq!(targets(&outbound), vec![2, 1]);
        for message in &outbound {
            assert_eq!(message.frame.kind, MessageKind::WrongGuess);
            let record = RoundRecord::from_frame(&message.frame).unwrap();
            assert_eq!(record.word, "Apple");
        }
        assert!(dispatcher.is_in_game(1));
    }

    #[test]
    fn test_correct_guess_finishes_round() {
        let mut dispatcher = dispatcher_with(2);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        let outbound = dispatcher.handle_frame(2, &word_frame(2, MessageKind::Guess, "apple"));

        assert_eq!(targets(&outbound), vec![2, 1]);
        for message in &outbound {
            assert_eq!(message.frame.kind, MessageKind::CorrectGuess);
            assert_eq!(message.frame.payload_len(), 0);
        }
        assert!(dispatcher.rounds().find_round(1).is_none());
        assert!(dispatcher.rounds().find_round(2).is_none());
        assert!(dispatcher.rounds().get(0).unwrap().finished);
    }

    #[test]
    fn test_only_guesser_may_guess() {
        let mut dispatcher = dispatcher_with(3);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        assert!(dispatcher
            .handle_frame(1, &word_frame(1, MessageKind::Guess, "apple"))
            .is_empty());
        assert!(dispatcher
            .handle_frame(3, &word_frame(3, MessageKind::Guess, "apple"))
            .is_empty());
        assert!(dispatcher.is_in_game(2));
    }

    #[test]
    fn test_hint_goes_to_guesser_only() {
        let mut dispatcher = dispatcher_with(2);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        let outbound = dispatcher.handle_frame(1, &word_frame(1, MessageKind::Hint, "fruit"));

        assert_eq!(targets(&outbound), vec![2]);
        assert_eq!(outbound[0].frame.kind, MessageKind::Hint);
        let record = RoundRecord::from_frame(&outbound[0].frame).unwrap();
        assert_eq!(record.word, "fruit");

        assert!(dispatcher
            .handle_frame(2, &word_frame(2, MessageKind::Hint, "nope"))
            .is_empty());
    }

    #[test]
    fn test_exit_finishes_session_and_round() {
        let mut dispatcher = dispatcher_with(2);
        dispatcher.handle_frame(1, &round_request(1, 2, "apple"));

        let outbound = dispatcher.handle_frame(2, &Frame::empty(2, MessageKind::Exit));

        assert!(outbound.is_empty());
        assert!(dispatcher.sessions().is_finished(2));
        assert!(dispatcher.rounds().find_round(2).is_none());
        assert!(dispatcher.rounds().find_round(1).is_none());
        assert!(!dispatcher.sessions().is_finished(1));
    }

    #[test]
    fn test_frames_from_finished_sessions_ignored() {
        let mut dispatcher = dispatcher_with(3);
        dispatcher.disconnect(1);

        assert!(dispatcher
            .handle_frame(1, &round_request(1, 2, "apple"))
            .is_empty());
        assert!(!dispatcher.disconnect(1));
    }

    #[test]
    fn test_unhandled_kinds_ignored() {
        let mut dispatcher = dispatcher_with(2);

        for kind in [
            MessageKind::AskOpponent,
            MessageKind::AssignId,
            MessageKind::CorrectGuess,
            MessageKind::EnterPassword,
        ] {
            assert!(dispatcher.handle_frame(1, &Frame::empty(1, kind)).is_empty());
        }
    }

    #[test]
    fn test_malformed_round_request_ignored() {
        let mut dispatcher = dispatcher_with(2);
        let frame = Frame::new(1, MessageKind::SelectOpponent, b"garbage").unwrap();

        assert!(dispatcher.handle_frame(1, &frame).is_empty());
        assert!(dispatcher.rounds().is_empty());
    }

    #[test]
    fn test_farewell_targets_open_sessions() {
        let mut dispatcher = dispatcher_with(3);
        dispatcher.disconnect(2);

        let outbound = dispatcher.farewell();
        assert_eq!(targets(&outbound), vec![1, 3]);
        assert_eq!(outbound[0].frame.kind, MessageKind::Exit);
        assert_eq!(outbound[0].frame.payload(), b"exit");
    }
}
