//! In-memory session registry.
//!
//! The single source of truth for "does session X exist" and "which
//! connection is current". Only the lifecycle manager mutates it; everything
//! else reads through `get`.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use wagate_types::error::GatewayError;
use wagate_types::session::SessionId;

use crate::session::Session;

pub struct SessionRegistry<H> {
    sessions: DashMap<SessionId, Arc<Session<H>>>,
}

impl<H> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl<H> SessionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session. Never replaces an existing entry.
    pub(crate) fn add(&self, session: Arc<Session<H>>) -> Result<(), GatewayError> {
        match self.sessions.entry(session.id().clone()) {
            Entry::Occupied(entry) => Err(GatewayError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Install `session` as the current connection, returning the one it
    /// replaced.
    pub(crate) fn replace(&self, session: Arc<Session<H>>) -> Option<Arc<Session<H>>> {
        self.sessions.insert(session.id().clone(), session)
    }

    /// Remove unconditionally. Idempotent.
    pub(crate) fn remove(&self, id: &SessionId) -> Option<Arc<Session<H>>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Remove only if the registered connection is still `generation`.
    pub(crate) fn remove_generation(&self, id: &SessionId, generation: u64) -> Option<Arc<Session<H>>> {
        self.sessions
            .remove_if(id, |_, session| session.generation() == generation)
            .map(|(_, session)| session)
    }

    pub fn get(&self, id: &SessionId) -> Result<Arc<Session<H>>, GatewayError> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }

    /// The session, if it is registered with the given generation.
    pub fn get_current(&self, id: &SessionId, generation: u64) -> Option<Arc<Session<H>>> {
        self.sessions
            .get(id)
            .filter(|s| s.generation() == generation)
            .map(|s| s.clone())
    }

    pub fn exists(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Snapshot of every registered session, sorted by id.
    pub fn list(&self) -> Vec<Arc<Session<H>>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
