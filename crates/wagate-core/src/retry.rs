//! Restart scheduling for sessions whose connection closed.
//!
//! At most one restart is pending per session. A pending restart is tied to
//! the connection generation that closed: a close from the same generation
//! never schedules a second timer, while a close from a newer generation
//! supersedes a stale timer. Firing timers do not restart anything
//! themselves; they hand a `RestartRequest` to the lifecycle manager's
//! recovery loop, which re-validates the session under its lifecycle lock.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wagate_types::config::RetryPolicy;
use wagate_types::session::SessionId;

/// A due restart, delivered to the recovery loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    pub session_id: SessionId,
    /// 1-based consecutive restart number.
    pub attempt: u32,
    /// Generation of the connection that closed.
    pub generation: u64,
}

#[derive(Debug)]
struct PendingRestart {
    generation: u64,
    token: CancellationToken,
}

// ---------------------------------------------------------------------------
// RetryScheduler
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RetryScheduler {
    policy: RetryPolicy,
    pending: DashMap<SessionId, PendingRestart>,
    due: mpsc::UnboundedSender<RestartRequest>,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy, due: mpsc::UnboundedSender<RestartRequest>) -> Self {
        Self {
            policy,
            pending: DashMap::new(),
            due,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Arm a restart timer for `session_id`.
    ///
    /// Returns the delay, or None when a restart for this generation is
    /// already pending.
    pub fn schedule(&self, session_id: &SessionId, generation: u64, attempt: u32) -> Option<Duration> {
        let token = CancellationToken::new();
        match self.pending.entry(session_id.clone()) {
            Entry::Occupied(entry) if entry.get().generation == generation => return None,
            Entry::Occupied(mut entry) => {
                entry.get().token.cancel();
                entry.insert(PendingRestart {
                    generation,
                    token: token.clone(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(PendingRestart {
                    generation,
                    token: token.clone(),
                });
            }
        }

        let delay = self.policy.delay(attempt);
        let request = RestartRequest {
            session_id: session_id.clone(),
            attempt,
            generation,
        };
        let due = self.due.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = due.send(request);
                }
            }
        });
        Some(delay)
    }

    /// Claim a due restart. Returns false if it was cancelled or superseded
    /// after the timer fired.
    pub fn take(&self, session_id: &SessionId, generation: u64) -> bool {
        self.pending
            .remove_if(session_id, |_, pending| pending.generation == generation)
            .is_some()
    }

    /// Cancel any pending restart for `session_id`.
    pub fn cancel(&self, session_id: &SessionId) -> bool {
        match self.pending.remove(session_id) {
            Some((_, pending)) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, session_id: &SessionId) -> bool {
        self.pending.contains_key(session_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every pending restart.
    pub fn cancel_all(&self) {
        self.pending.retain(|_, pending| {
            pending.token.cancel();
            false
        });
    }
}
