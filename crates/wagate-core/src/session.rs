//! Live session handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wagate_types::session::{
    AccountIdentity, PairingChallenge, SessionId, SessionPhase, SessionStatus,
};

/// Mutable per-session state, published through a watch channel so readers
/// always see a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub pairing_challenge: Option<PairingChallenge>,
    pub identity: Option<AccountIdentity>,
    /// Consecutive automatic restarts since the connection was last open.
    pub restart_attempts: u32,
    pub updated_at: DateTime<Utc>,
}

/// One live connection of a session.
///
/// Each (re)connect produces a new `Session` with a fresh generation number;
/// events carrying an older generation are ignored.
pub struct Session<H> {
    id: SessionId,
    generation: u64,
    handle: Arc<H>,
    state: watch::Sender<SessionState>,
    events_token: CancellationToken,
}

impl<H> Session<H> {
    pub(crate) fn new(id: SessionId, generation: u64, handle: H, restart_attempts: u32) -> Self {
        let (state, _) = watch::channel(SessionState {
            phase: SessionPhase::Starting,
            pairing_challenge: None,
            identity: None,
            restart_attempts,
            updated_at: Utc::now(),
        });
        Self {
            id,
            generation,
            handle: Arc::new(handle),
            state,
            events_token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&self) -> &Arc<H> {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    /// Watch state changes of this connection.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state.borrow();
        SessionStatus {
            session_id: self.id.clone(),
            status: state.phase.connection_status(),
            phase: state.phase,
            identity: state.identity.clone(),
            pairing_pending: state.pairing_challenge.is_some(),
            restart_attempts: state.restart_attempts,
            updated_at: state.updated_at,
        }
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(|state| {
            f(state);
            state.updated_at = Utc::now();
        });
    }

    /// Token the event task watches; cancelled when the session is torn down.
    pub(crate) fn events_token(&self) -> CancellationToken {
        self.events_token.clone()
    }

    /// Stop consuming provider events. An event already being handled
    /// finishes; nothing after it is processed.
    pub(crate) fn stop_events(&self) {
        self.events_token.cancel();
    }
}

impl<H> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("phase", &self.phase())
            .finish()
    }
}
