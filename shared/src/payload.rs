//! Typed records carried in the payload region of a frame.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::frame::{Frame, MessageKind, RoundId, SessionId, PAYLOAD_CAPACITY};

/// Longest secret word, guess or hint in bytes.
pub const WORD_CAPACITY: usize = 54;

/// Most session ids an opponent list can carry in one payload.
pub const MAX_OPPONENTS: usize = (PAYLOAD_CAPACITY - 8) / 8;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(PAYLOAD_CAPACITY as u64)
}

/// A record that can be written into and read back out of a frame payload.
pub trait PayloadRecord: Serialize + DeserializeOwned {
    /// Shape checks applied on both encode and decode.
    fn validate(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn to_frame(&self, id: SessionId, kind: MessageKind) -> Result<Frame, ProtocolError> {
        self.validate()?;
        let bytes = options().serialize(self)?;
        Frame::new(id, kind, &bytes)
    }

    fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let record: Self = options().deserialize(frame.payload())?;
        record.validate()?;
        Ok(record)
    }
}

/// Round state as exchanged on the wire.
///
/// `word` is the secret word when a chooser requests a round, the attempted
/// word in guesses and wrong-guess replies, the hint text in hints, and empty
/// in the round-started announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: RoundId,
    pub guesser: SessionId,
    pub chooser: SessionId,
    pub finished: bool,
    pub word: String,
}

impl RoundRecord {
    pub fn new(id: RoundId, guesser: SessionId, chooser: SessionId, word: &str) -> Self {
        Self {
            id,
            guesser,
            chooser,
            finished: false,
            word: word.to_string(),
        }
    }

    /// Copy of the record with the word cleared.
    pub fn blanked(&self) -> Self {
        self.with_word("")
    }

    /// Copy of the record carrying a different word.
    pub fn with_word(&self, word: &str) -> Self {
        Self {
            word: word.to_string(),
            ..self.clone()
        }
    }
}

impl PayloadRecord for RoundRecord {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.word.len() > WORD_CAPACITY {
            return Err(ProtocolError::InvalidPayload(format!(
                "word of {} bytes exceeds {} bytes",
                self.word.len(),
                WORD_CAPACITY
            )));
        }
        Ok(())
    }
}

/// Ordered ids of the sessions available for a new round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentList(pub Vec<SessionId>);

impl OpponentList {
    pub fn ids(&self) -> &[SessionId] {
        &self.0
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.0.contains(&id)
    }

    /// Ids to present to `viewer`, which never includes the viewer itself.
    pub fn excluding(&self, viewer: SessionId) -> Vec<SessionId> {
        self.0.iter().copied().filter(|id| *id != viewer).collect()
    }
}

impl PayloadRecord for OpponentList {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.0.len() > MAX_OPPONENTS {
            return Err(ProtocolError::InvalidPayload(format!(
                "{} opponents exceed the limit of {}",
                self.0.len(),
                MAX_OPPONENTS
            )));
        }
        if self.0.contains(&0) {
            return Err(ProtocolError::InvalidPayload(
                "opponent list contains the unassigned id".to_string(),
            ));
        }
        Ok(())
    }
}
