//! Broadcast bus for gateway lifecycle and message events.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op; slow subscribers lag rather than block the publisher.

use serde::Serialize;
use tokio::sync::broadcast;
use wagate_types::session::{AccountIdentity, SessionId};

/// Something observable happened to a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    SessionStarted {
        session_id: SessionId,
        generation: u64,
    },
    PairingIssued {
        session_id: SessionId,
    },
    Connected {
        session_id: SessionId,
        identity: Option<AccountIdentity>,
    },
    Disconnected {
        session_id: SessionId,
        reason: Option<String>,
    },
    RestartScheduled {
        session_id: SessionId,
        attempt: u32,
        delay_ms: u64,
    },
    SessionTerminated {
        session_id: SessionId,
    },
    SessionRemoved {
        session_id: SessionId,
    },
    MessageRecorded {
        session_id: SessionId,
        message_id: String,
        from: String,
    },
    AutoReplySent {
        session_id: SessionId,
        to: String,
        keyword: String,
    },
    AutoReplyFailed {
        session_id: SessionId,
        to: String,
        error: String,
    },
}

impl GatewayEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            GatewayEvent::SessionStarted { session_id, .. }
            | GatewayEvent::PairingIssued { session_id }
            | GatewayEvent::Connected { session_id, .. }
            | GatewayEvent::Disconnected { session_id, .. }
            | GatewayEvent::RestartScheduled { session_id, .. }
            | GatewayEvent::SessionTerminated { session_id }
            | GatewayEvent::SessionRemoved { session_id }
            | GatewayEvent::MessageRecorded { session_id, .. }
            | GatewayEvent::AutoReplySent { session_id, .. }
            | GatewayEvent::AutoReplyFailed { session_id, .. } => session_id,
        }
    }

    /// Short event name, used as the SSE event type.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::SessionStarted { .. } => "session_started",
            GatewayEvent::PairingIssued { .. } => "pairing_issued",
            GatewayEvent::Connected { .. } => "connected",
            GatewayEvent::Disconnected { .. } => "disconnected",
            GatewayEvent::RestartScheduled { .. } => "restart_scheduled",
            GatewayEvent::SessionTerminated { .. } => "session_terminated",
            GatewayEvent::SessionRemoved { .. } => "session_removed",
            GatewayEvent::MessageRecorded { .. } => "message_recorded",
            GatewayEvent::AutoReplySent { .. } => "auto_reply_sent",
            GatewayEvent::AutoReplyFailed { .. } => "auto_reply_failed",
        }
    }
}

/// Multi-consumer event bus. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: GatewayEvent) {
        let _ = self.sender.send(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
