//! Round registry for two-player guessing rounds

use log::info;
use shared::{RoundId, RoundRecord, SessionId};

/// One two-player round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub guesser: SessionId,
    pub chooser: SessionId,
    pub finished: bool,
    pub secret_word: String,
}

impl Round {
    pub fn involves(&self, session: SessionId) -> bool {
        self.guesser == session || self.chooser == session
    }

    /// Wire form of the round carrying the secret word.
    pub fn record(&self) -> RoundRecord {
        RoundRecord {
            id: self.id,
            guesser: self.guesser,
            chooser: self.chooser,
            finished: self.finished,
            word: self.secret_word.clone(),
        }
    }
}

/// Active and finished rounds, indexed by id
///
/// Round ids start at 0 and equal the round's position in the registry.
/// Lookups by participant scan linearly; the registry never holds more
/// rounds than the server has sessions to pair.
#[derive(Debug, Default)]
pub struct RoundRegistry {
    rounds: Vec<Round>,
}

impl RoundRegistry {
    pub fn new() -> Self {
        Self { rounds: Vec::new() }
    }

    /// Stores a new round with the next sequential id.
    pub fn create(&mut self, chooser: SessionId, guesser: SessionId, secret_word: &str) -> &Round {
        let id = self.rounds.len() as RoundId;
        self.rounds.push(Round {
            id,
            guesser,
            chooser,
            finished: false,
            secret_word: secret_word.to_string(),
        });

        info!(
            "Round {} started (chooser = {}, guesser = {})",
            id, chooser, guesser
        );
        &self.rounds[id as usize]
    }

    pub fn get(&self, id: RoundId) -> Option<&Round> {
        self.rounds.get(id as usize)
    }

    /// First unfinished round in which `session` is guesser or chooser.
    pub fn find_round(&self, session: SessionId) -> Option<&Round> {
        self.rounds
            .iter()
            .find(|round| !round.finished && round.involves(session))
    }

    pub fn is_in_game(&self, session: SessionId) -> bool {
        self.find_round(session).is_some()
    }

    /// Marks a round finished. Finished rounds are never touched again.
    pub fn finish(&mut self, id: RoundId) -> bool {
        match self.rounds.get_mut(id as usize) {
            Some(round) if !round.finished => {
                round.finished = true;
                info!("Round {} finished", id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_ids_start_at_zero() {
        let mut rounds = RoundRegistry::new();

        assert_eq!(rounds.create(1, 2, "apple").id, 0);
        assert_eq!(rounds.create(3, 4, "pear").id, 1);
        assert_eq!(rounds.len(), 2);
    }

    #[test]
    fn test_find_round_by_either_participant() {
        let mut rounds = RoundRegistry::new();
        rounds.create(1, 2, "apple");

        assert_eq!(rounds.find_round(1).unwrap().id, 0);
        assert_eq!(rounds.find_round(2).unwrap().id, 0);
        assert!(rounds.find_round(3).is_none());
        assert!(rounds.is_in_game(1));
        assert!(!rounds.is_in_game(3));
    }

    #[test]
    fn test_finished_rounds_are_skipped() {
        let mut rounds = RoundRegistry::new();
        rounds.create(1, 2, "apple");
        rounds.create(1, 3, "pear");

        assert!(rounds.finish(0));
        assert_eq!(rounds.find_round(1).unwrap().id, 1);
        assert!(rounds.find_round(2).is_none());

        assert!(!rounds.finish(0));
        assert!(!rounds.finish(9));
    }

    #[test]
    fn test_record_carries_secret_word() {
        let mut rounds = RoundRegistry::new();
        let record = rounds.create(1, 2, "apple").record();

        assert_eq!(record.chooser, 1);
        assert_eq!(record.guesser, 2);
        assert_eq!(record.word, "apple");
        assert!(!record.finished);
        assert!(record.blanked().word.is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let mut rounds = RoundRegistry::new();
        rounds.create(5, 6, "plum");

        assert_eq!(rounds.get(0).unwrap().secret_word, "plum");
        assert!(rounds.get(1).is_none());
        assert!(!rounds.is_empty());
    }
}
