//! Session registry for authenticated connections
//!
//! This module tracks every connection that passed the password check:
//! - Sequential identity assignment starting at 1
//! - Exclusive ownership of each session's transport handle
//! - Finished tracking for sessions that quit or disconnected
//! - Capacity enforcement for the lifetime of the process
//!
//! Records are never removed. A session that quits keeps its record (and its
//! slot) so id-based lookups stay valid until the process exits.

use log::info;
use shared::SessionId;
use std::collections::BTreeMap;

/// One authenticated connection
///
/// `T` is the transport handle owned by the session. The networked server
/// stores the write side of the connection here; the protocol state machine
/// never looks inside it.
#[derive(Debug)]
pub struct Session<T> {
    /// Identity assigned at authentication, never reused
    pub id: SessionId,
    /// Transport handle, dropped when the session finishes
    transport: Option<T>,
    /// Whether the session quit or its round concluded
    pub round_finished: bool,
}

impl<T> Session<T> {
    fn new(id: SessionId, transport: T) -> Self {
        Self {
            id,
            transport: Some(transport),
            round_finished: false,
        }
    }

    /// Whether the session still owns an open transport
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }
}

/// Why a connection was not admitted
///
/// The rejected transport is handed back so the caller can tell the peer
/// before closing it.
#[derive(Debug)]
pub enum AuthFailure<T> {
    /// Supplied bytes differ from the expected password
    WrongPassword(T),
    /// Every session slot is taken
    ServerFull(T),
}

impl<T> AuthFailure<T> {
    pub fn into_transport(self) -> T {
        match self {
            AuthFailure::WrongPassword(transport) | AuthFailure::ServerFull(transport) => transport,
        }
    }
}

/// Byte-exact password comparison, including length
pub fn verify_password(supplied: &[u8], expected: &[u8]) -> bool {
    supplied == expected
}

/// Registry of authenticated sessions
///
/// Ids are allocated sequentially and are never handed out twice. Once the
/// registry holds `max_sessions` records it stays full, because finished
/// sessions keep their slot.
pub struct SessionRegistry<T> {
    /// Sessions indexed by id, iterated in id order
    sessions: BTreeMap<SessionId, Session<T>>,
    /// Next id to hand out
    next_id: SessionId,
    /// Maximum number of sessions admitted over the process lifetime
    max_sessions: usize,
}

impl<T> SessionRegistry<T> {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
            max_sessions,
        }
    }

    /// Admits a connection whose supplied password matches
    ///
    /// A wrong password or a full registry hands the transport back without
    /// consuming an id or a slot.
    pub fn authenticate(
        &mut self,
        transport: T,
        supplied: &[u8],
        expected: &[u8],
    ) -> Result<SessionId, AuthFailure<T>> {
        if self.is_full() {
            return Err(AuthFailure::ServerFull(transport));
        }
        if !verify_password(supplied, expected) {
            return Err(AuthFailure::WrongPassword(transport));
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("A new user (id = {}) authenticated", id);
        self.sessions.insert(id, Session::new(id, transport));

        Ok(id)
    }

    pub fn lookup(&self, id: SessionId) -> Option<&Session<T>> {
        self.sessions.get(&id)
    }

    /// Mutable access to a session's open transport
    pub fn transport_mut(&mut self, id: SessionId) -> Option<&mut T> {
        self.sessions
            .get_mut(&id)
            .and_then(|session| session.transport.as_mut())
    }

    /// Unknown ids count as finished
    pub fn is_finished(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .map(|session| session.round_finished)
            .unwrap_or(true)
    }

    /// Marks a session finished and drops its transport
    ///
    /// Returns false if the id is unknown or the session was already finished.
    pub fn mark_finished(&mut self, id: SessionId) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) if !session.round_finished => {
                session.round_finished = true;
                session.transport = None;
                true
            }
            _ => false,
        }
    }

    /// Ids of sessions that have not finished, in ascending order
    pub fn active_ids(&self) -> Vec<SessionId> {
        self.sessions
            .values()
            .filter(|session| !session.round_finished)
            .map(|session| session.id)
            .collect()
    }

    /// Drops every transport, returning the ids that were still open
    pub fn close_all(&mut self) -> Vec<SessionId> {
        let mut closed = Vec::new();
        for session in self.sessions.values_mut() {
            if session.transport.take().is_some() {
                closed.push(session.id);
            }
        }
        closed
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
