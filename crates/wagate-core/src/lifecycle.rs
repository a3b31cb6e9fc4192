//! Session lifecycle manager.
//!
//! Owns the per-session state machine
//! `Starting -> Authenticating -> Connected -> Disconnected -> {Starting | Terminated}`
//! and every operation that creates, tears down or recovers a session.
//!
//! Concurrency model:
//! - Start, reset, logout and recovery for one session id run under a
//!   per-id lifecycle lock, so at most one of them is in flight per session.
//! - Each connection gets one task that drains its provider event channel in
//!   order. Events are tagged with the connection's generation and dropped
//!   once a newer connection (or none) is registered.
//! - Closed connections are restarted through the `RetryScheduler`; due
//!   restarts arrive on a channel drained by a recovery loop task, which
//!   re-validates the session before reconnecting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use wagate_types::address::{AddressKind, NumberingPlan};
use wagate_types::config::{GatewayConfig, RetryPolicy};
use wagate_types::error::{AddressError, GatewayError};
use wagate_types::message::{
    AddressLookup, GroupInfo, InboxEntry, MediaPayload, OutboundPayload, SendReceipt,
};
use wagate_types::rule::AutoReplyRule;
use wagate_types::session::{PairingChallenge, SessionId, SessionPhase, SessionStatus};

use crate::auto_reply::AutoReplyEngine;
use crate::event::{EventBus, GatewayEvent};
use crate::ingest::{IngestOutcome, IngestPipeline, ReplyOutcome};
use crate::provider::{
    Connection, ConnectionHandle, ConnectionProvider, ConnectRequest, LinkState, ProviderEvent,
};
use crate::registry::SessionRegistry;
use crate::repository::credentials::CredentialRepository;
use crate::repository::inbox::InboxRepository;
use crate::repository::rules::RuleRepository;
use crate::retry::{RestartRequest, RetryScheduler};
use crate::session::Session;
use crate::store::DocumentStore;
use crate::sync::KeyedMutex;

/// Runtime knobs of the lifecycle manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    pub retry: RetryPolicy,
    pub numbering: NumberingPlan,
    /// Capacity of each connection's provider event channel.
    pub event_buffer: usize,
    /// Capacity of the gateway event bus.
    pub bus_capacity: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            numbering: NumberingPlan::default(),
            event_buffer: 256,
            bus_capacity: 1024,
        }
    }
}

impl From<&GatewayConfig> for SessionManagerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            retry: config.retry.clone(),
            numbering: config.numbering.clone(),
            event_buffer: config.sessions.event_buffer,
            ..Self::default()
        }
    }
}

/// Outcome of restoring persisted sessions at boot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<SessionId>,
    /// Already running; left untouched.
    pub skipped: Vec<SessionId>,
    pub failed: Vec<(SessionId, String)>,
}

/// Whether a launch may replace a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchMode {
    Insert,
    Replace,
}

/// Whether the event task keeps consuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventFlow {
    Continue,
    Stop,
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Entry point for every session operation. Cheap to clone.
pub struct SessionManager<P: ConnectionProvider, S: DocumentStore> {
    inner: Arc<ManagerInner<P, S>>,
}

impl<P: ConnectionProvider, S: DocumentStore> Clone for SessionManager<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ManagerInner<P: ConnectionProvider, S: DocumentStore> {
    provider: P,
    registry: SessionRegistry<P::Handle>,
    credentials: CredentialRepository<S>,
    pipeline: IngestPipeline<S>,
    auto_reply: Arc<AutoReplyEngine<S>>,
    retry: RetryScheduler,
    lifecycle_locks: KeyedMutex,
    config: SessionManagerConfig,
    next_generation: AtomicU64,
    events: EventBus,
    recovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl<P: ConnectionProvider, S: DocumentStore> SessionManager<P, S> {
    /// Build a manager over `provider` and `store`, loading the persisted
    /// auto-reply rules and starting the recovery loop.
    pub async fn new(provider: P, store: Arc<S>, config: SessionManagerConfig) -> Result<Self, GatewayError> {
        let auto_reply = Arc::new(AutoReplyEngine::load(RuleRepository::new(store.clone())).await?);
        let (due_tx, due_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ManagerInner {
            provider,
            registry: SessionRegistry::new(),
            credentials: CredentialRepository::new(store.clone()),
            pipeline: IngestPipeline::new(InboxRepository::new(store), auto_reply.clone()),
            auto_reply,
            retry: RetryScheduler::new(config.retry.clone(), due_tx),
            lifecycle_locks: KeyedMutex::new(),
            events: EventBus::new(config.bus_capacity),
            config,
            next_generation: AtomicU64::new(0),
            recovery_task: Mutex::new(None),
        });

        let task = tokio::spawn(recovery_loop(Arc::downgrade(&inner), due_rx));
        *inner
            .recovery_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        Ok(Self { inner })
    }

    fn from_weak(weak: &Weak<ManagerInner<P, S>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Read access to the live session registry.
    pub fn registry(&self) -> &SessionRegistry<P::Handle> {
        &self.inner.registry
    }

    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    pub fn numbering_plan(&self) -> &NumberingPlan {
        &self.inner.config.numbering
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.inner.retry.policy()
    }

    /// Subscribe to lifecycle and message events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a restart is currently pending for `id`.
    pub fn restart_pending(&self, id: &SessionId) -> bool {
        self.inner.retry.is_pending(id)
    }

    // -- Lifecycle operations ------------------------------------------------

    /// Start a new session.
    ///
    /// Fails with `AlreadyExists` if the id is registered; the running
    /// session is left untouched.
    pub async fn start_session(&self, id: &SessionId) -> Result<SessionStatus, GatewayError> {
        let _guard = self.inner.lifecycle_locks.lock(id.as_str()).await;
        if self.inner.registry.exists(id) {
            return Err(GatewayError::AlreadyExists(id.clone()));
        }
        let session = self.launch(id, 0, LaunchMode::Insert).await?;
        tracing::info!(session_id = %id, generation = session.generation(), "session started");
        Ok(session.status())
    }

    /// Forget the session's credentials and start over with a fresh pairing
    /// challenge under the same id.
    ///
    /// If the credentials cannot be deleted the running session is left
    /// untouched.
    pub async fn reset_session(&self, id: &SessionId) -> Result<SessionStatus, GatewayError> {
        let _guard = self.inner.lifecycle_locks.lock(id.as_str()).await;
        let existing = self.inner.registry.get(id)?;

        self.inner.credentials.delete(id).await?;
        existing.stop_events();
        self.inner.retry.cancel(id);
        if let Err(e) = existing.handle().logout().await {
            tracing::warn!(session_id = %id, error = %e, "logout during reset failed; continuing");
        }
        self.inner.registry.remove(id);
        existing.handle().close();
        self.inner.events.publish(GatewayEvent::SessionRemoved {
            session_id: id.clone(),
        });

        let session = self.launch(id, 0, LaunchMode::Insert).await?;
        tracing::info!(session_id = %id, generation = session.generation(), "session reset");
        Ok(session.status())
    }

    /// Log the session out of the network and remove it.
    ///
    /// The session is removed even when the provider logout fails; stored
    /// credentials are only deleted after a successful logout.
    pub async fn logout(&self, id: &SessionId) -> Result<(), GatewayError> {
        let _guard = self.inner.lifecycle_locks.lock(id.as_str()).await;
        let session = self.inner.registry.get(id)?;

        session.stop_events();
        self.inner.retry.cancel(id);
        let result = session.handle().logout().await;

        self.inner.registry.remove(id);
        session.handle().close();
        session.update(|state| {
            state.phase = SessionPhase::Terminated;
            state.pairing_challenge = None;
        });
        self.inner.events.publish(GatewayEvent::SessionRemoved {
            session_id: id.clone(),
        });

        match result {
            Ok(()) => {
                tracing::info!(session_id = %id, "session logged out");
                if let Err(e) = self.inner.credentials.delete(id).await {
                    tracing::error!(
                        session_id = %id,
                        error = %e,
                        "logout succeeded but stored credentials could not be deleted"
                    );
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "provider logout failed; session removed");
                Err(GatewayError::LogoutFailed(e))
            }
        }
    }

    /// Start every session that has stored credentials.
    ///
    /// Individual failures are logged and reported; they never abort the
    /// restore of other sessions.
    pub async fn restore_sessions(&self) -> Result<RestoreReport, GatewayError> {
        let ids = self.inner.credentials.list_session_ids().await?;
        let results = join_all(ids.into_iter().map(|id| async move {
            let result = self.start_session(&id).await;
            (id, result)
        }))
        .await;

        let mut report = RestoreReport::default();
        for (id, result) in results {
            match result {
                Ok(_) => report.restored.push(id),
                Err(GatewayError::AlreadyExists(_)) => report.skipped.push(id),
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "failed to restore session");
                    report.failed.push((id, e.to_string()));
                }
            }
        }
        tracing::info!(
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "session restore complete"
        );
        Ok(report)
    }

    /// Stop all event processing and pending restarts and close every
    /// connection. Stored credentials are kept for the next boot.
    pub async fn shutdown(&self) {
        self.inner.retry.cancel_all();
        if let Some(task) = self
            .inner
            .recovery_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        for session in self.inner.registry.list() {
            let _guard = self.inner.lifecycle_locks.lock(session.id().as_str()).await;
            session.stop_events();
            session.handle().close();
            self.inner.registry.remove_generation(session.id(), session.generation());
        }
        tracing::info!("session manager shut down");
    }

    // -- Queries -------------------------------------------------------------

    pub fn get_status(&self, id: &SessionId) -> Result<SessionStatus, GatewayError> {
        Ok(self.inner.registry.get(id)?.status())
    }

    pub fn list_sessions(&self) -> Vec<SessionStatus> {
        self.inner
            .registry
            .list()
            .iter()
            .map(|session| session.status())
            .collect()
    }

    /// The pairing challenge waiting to be scanned, if any.
    pub fn get_pairing_challenge(&self, id: &SessionId) -> Result<PairingChallenge, GatewayError> {
        self.inner
            .registry
            .get(id)?
            .state()
            .pairing_challenge
            .ok_or_else(|| GatewayError::PairingUnavailable(id.clone()))
    }

    /// The session's inbox in arrival order.
    ///
    /// A session that is not running but has a stored inbox still returns
    /// it; `NotFound` means neither exists.
    pub async fn get_inbox(&self, id: &SessionId) -> Result<Vec<InboxEntry>, GatewayError> {
        match self.inner.pipeline.inbox().list(id).await? {
            Some(entries) => Ok(entries),
            None if self.inner.registry.exists(id) => Ok(Vec::new()),
            None => Err(GatewayError::NotFound(id.clone())),
        }
    }

    // -- Rules ---------------------------------------------------------------

    pub fn rules(&self) -> Arc<Vec<AutoReplyRule>> {
        self.inner.auto_reply.rules()
    }

    pub async fn set_rules(&self, rules: Vec<AutoReplyRule>) -> Result<Arc<Vec<AutoReplyRule>>, GatewayError> {
        self.inner.auto_reply.set_rules(rules).await
    }

    // -- Outbound ------------------------------------------------------------

    pub async fn send_text(&self, id: &SessionId, raw_target: &str, text: &str) -> Result<SendReceipt, GatewayError> {
        if text.trim().is_empty() {
            return Err(GatewayError::Validation("message text cannot be empty".to_string()));
        }
        self.send(id, raw_target, OutboundPayload::Text(text.to_string()))
            .await
    }

    pub async fn send_media(
        &self,
        id: &SessionId,
        raw_target: &str,
        media: MediaPayload,
    ) -> Result<SendReceipt, GatewayError> {
        if media.data.is_empty() {
            return Err(GatewayError::Validation("media data cannot be empty".to_string()));
        }
        let mime = media.mime_type.trim();
        if mime.is_empty() || !mime.contains('/') {
            return Err(GatewayError::Validation(format!(
                "invalid mime type '{}'",
                media.mime_type
            )));
        }
        self.send(id, raw_target, OutboundPayload::Media(media)).await
    }

    async fn send(&self, id: &SessionId, raw_target: &str, payload: OutboundPayload) -> Result<SendReceipt, GatewayError> {
        let session = self.connected(id)?;
        let target = self.inner.config.numbering.normalize(raw_target)?;
        let receipt = session
            .handle()
            .send(&target, payload)
            .await
            .map_err(GatewayError::SendFailed)?;
        tracing::debug!(session_id = %id, to = %target, message_id = %receipt.message_id, "message sent");
        Ok(receipt)
    }

    pub async fn list_groups(&self, id: &SessionId) -> Result<Vec<GroupInfo>, GatewayError> {
        let session = self.connected(id)?;
        session
            .handle()
            .list_groups()
            .await
            .map_err(GatewayError::QueryFailed)
    }

    pub async fn group_metadata(&self, id: &SessionId, raw_group: &str) -> Result<GroupInfo, GatewayError> {
        let session = self.connected(id)?;
        let group = self.inner.config.numbering.normalize(raw_group)?;
        if group.kind() != AddressKind::Group {
            return Err(AddressError::NotAGroup(raw_group.to_string()).into());
        }
        session
            .handle()
            .group_metadata(&group)
            .await
            .map_err(GatewayError::QueryFailed)
    }

    /// Ask the network whether `raw_target` is a registered account.
    pub async fn check_address(&self, id: &SessionId, raw_target: &str) -> Result<AddressLookup, GatewayError> {
        let session = self.connected(id)?;
        let address = self.inner.config.numbering.normalize(raw_target)?;
        session
            .handle()
            .lookup_address(&address)
            .await
            .map_err(GatewayError::QueryFailed)
    }

    fn connected(&self, id: &SessionId) -> Result<Arc<Session<P::Handle>>, GatewayError> {
        let session = self.inner.registry.get(id)?;
        if session.phase() != SessionPhase::Connected {
            return Err(GatewayError::NotConnected(id.clone()));
        }
        Ok(session)
    }

    // -- Internals -----------------------------------------------------------

    /// Connect and register a new connection for `id`.
    ///
    /// Caller must hold the lifecycle lock for `id`.
    async fn launch(
        &self,
        id: &SessionId,
        restart_attempts: u32,
        mode: LaunchMode,
    ) -> Result<Arc<Session<P::Handle>>, GatewayError> {
        let credentials = self.inner.credentials.load(id).await?.map(|r| r.credentials);
        let resumed = credentials.is_some();
        let Connection { handle, events } = self
            .inner
            .provider
            .connect(ConnectRequest {
                session_id: id.clone(),
                credentials,
                event_buffer: self.inner.config.event_buffer,
            })
            .await
            .map_err(GatewayError::ConnectFailed)?;

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(Session::new(id.clone(), generation, handle, restart_attempts));
        match mode {
            LaunchMode::Insert => {
                if let Err(e) = self.inner.registry.add(session.clone()) {
                    session.handle().close();
                    return Err(e);
                }
            }
            LaunchMode::Replace => {
                self.inner.registry.replace(session.clone());
            }
        }

        tokio::spawn(run_events(
            Arc::downgrade(&self.inner),
            id.clone(),
            generation,
            session.events_token(),
            events,
        ));

        tracing::debug!(session_id = %id, generation, resumed, "connection launched");
        self.inner.events.publish(GatewayEvent::SessionStarted {
            session_id: id.clone(),
            generation,
        });
        Ok(session)
    }

    async fn handle_event(&self, id: &SessionId, generation: u64, event: ProviderEvent) -> EventFlow {
        let Some(session) = self.inner.registry.get_current(id, generation) else {
            tracing::debug!(session_id = %id, generation, "dropping event from stale connection");
            return EventFlow::Stop;
        };

        match event {
            ProviderEvent::CredentialsChanged(credentials) => {
                if let Err(e) = self.inner.credentials.save(id, credentials).await {
                    tracing::error!(session_id = %id, error = %e, "failed to persist credentials");
                }
                EventFlow::Continue
            }
            ProviderEvent::ConnectionUpdate {
                state,
                pairing_challenge,
            } => {
                if let Some(payload) = pairing_challenge {
                    session.update(|s| {
                        s.phase = SessionPhase::Authenticating;
                        s.pairing_challenge = Some(PairingChallenge {
                            payload,
                            issued_at: Utc::now(),
                        });
                    });
                    tracing::info!(session_id = %id, generation, "pairing challenge issued");
                    self.inner.events.publish(GatewayEvent::PairingIssued {
                        session_id: id.clone(),
                    });
                }
                match state {
                    Some(LinkState::Open) => {
                        self.handle_open(&session);
                        EventFlow::Continue
                    }
                    Some(LinkState::Close { reason }) => self.handle_close(&session, reason),
                    Some(LinkState::Connecting) | None => EventFlow::Continue,
                }
            }
            ProviderEvent::Inbound(message) => {
                let message_id = message.message_id.clone();
                match self.inner.pipeline.ingest(id, session.handle().as_ref(), message).await {
                    Ok(outcome) => self.publish_ingest(id, outcome),
                    Err(e) => {
                        tracing::error!(session_id = %id, message_id = %message_id, error = %e, "failed to record inbound message");
                    }
                }
                EventFlow::Continue
            }
        }
    }

    fn handle_open(&self, session: &Session<P::Handle>) {
        let identity = session.handle().identity();
        session.update(|s| {
            s.phase = SessionPhase::Connected;
            s.pairing_challenge = None;
            s.identity = identity.clone();
            s.restart_attempts = 0;
        });
        tracing::info!(
            session_id = %session.id(),
            generation = session.generation(),
            account = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("unknown"),
            "session connected"
        );
        self.inner.events.publish(GatewayEvent::Connected {
            session_id: session.id().clone(),
            identity,
        });
    }

    fn handle_close(&self, session: &Session<P::Handle>, reason: Option<String>) -> EventFlow {
        let id = session.id();
        let state = session.state();
        if matches!(state.phase, SessionPhase::Disconnected | SessionPhase::Terminated) {
            tracing::debug!(session_id = %id, "ignoring duplicate close");
            return EventFlow::Continue;
        }

        session.update(|s| {
            s.phase = SessionPhase::Disconnected;
            s.pairing_challenge = None;
        });
        tracing::warn!(
            session_id = %id,
            generation = session.generation(),
            reason = reason.as_deref().unwrap_or("unknown"),
            "connection closed"
        );
        self.inner.events.publish(GatewayEvent::Disconnected {
            session_id: id.clone(),
            reason,
        });

        let attempt = state.restart_attempts + 1;
        if self.schedule_restart(session, attempt) {
            EventFlow::Continue
        } else {
            EventFlow::Stop
        }
    }

    /// Schedule restart number `attempt`, or terminate the session when the
    /// retry policy is exhausted. Returns false if the session terminated.
    fn schedule_restart(&self, session: &Session<P::Handle>, attempt: u32) -> bool {
        let id = session.id();
        if !self.inner.retry.policy().allows(attempt) {
            self.terminate(session, attempt - 1);
            return false;
        }
        if let Some(delay) = self.inner.retry.schedule(id, session.generation(), attempt) {
            tracing::info!(
                session_id = %id,
                attempt,
                delay_ms = duration_ms(delay),
                "restart scheduled"
            );
            self.inner.events.publish(GatewayEvent::RestartScheduled {
                session_id: id.clone(),
                attempt,
                delay_ms: duration_ms(delay),
            });
        }
        true
    }

    fn terminate(&self, session: &Session<P::Handle>, attempts: u32) {
        let id = session.id();
        session.stop_events();
        session.update(|s| s.phase = SessionPhase::Terminated);
        self.inner.registry.remove_generation(id, session.generation());
        session.handle().close();
        tracing::error!(session_id = %id, attempts, "restart attempts exhausted; session terminated");
        self.inner.events.publish(GatewayEvent::SessionTerminated {
            session_id: id.clone(),
        });
    }

    /// Reconnect a session whose connection closed.
    async fn recover(&self, request: RestartRequest) {
        let RestartRequest {
            session_id: id,
            attempt,
            generation,
        } = request;
        let _guard = self.inner.lifecycle_locks.lock(id.as_str()).await;

        if !self.inner.retry.take(&id, generation) {
            tracing::debug!(session_id = %id, generation, "restart cancelled");
            return;
        }
        let Some(previous) = self.inner.registry.get_current(&id, generation) else {
            tracing::debug!(session_id = %id, generation, "session replaced or removed; skipping restart");
            return;
        };
        if previous.phase() != SessionPhase::Disconnected {
            return;
        }

        previous.stop_events();
        previous.handle().close();
        match self.launch(&id, attempt, LaunchMode::Replace).await {
            Ok(session) => {
                tracing::info!(
                    session_id = %id,
                    attempt,
                    generation = session.generation(),
                    "session restarted"
                );
            }
            Err(e) => {
                tracing::warn!(session_id = %id, attempt, error = %e, "restart failed");
                previous.update(|s| s.restart_attempts = attempt);
                self.schedule_restart(&previous, attempt + 1);
            }
        }
    }

    fn publish_ingest(&self, id: &SessionId, outcome: IngestOutcome) {
        let IngestOutcome::Recorded { entry, reply } = outcome else {
            return;
        };
        self.inner.events.publish(GatewayEvent::MessageRecorded {
            session_id: id.clone(),
            message_id: entry.message_id,
            from: entry.source_id,
        });
        match reply {
            Some(ReplyOutcome::Sent { action, .. }) => {
                self.inner.events.publish(GatewayEvent::AutoReplySent {
                    session_id: id.clone(),
                    to: action.target,
                    keyword: action.matched_keyword,
                });
            }
            Some(ReplyOutcome::Failed { action, error }) => {
                self.inner.events.publish(GatewayEvent::AutoReplyFailed {
                    session_id: id.clone(),
                    to: action.target,
                    error,
                });
            }
            None => {}
        }
    }
}

fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Drain one connection's events in order until the connection is stopped,
/// superseded, or the manager is dropped.
async fn run_events<P: ConnectionProvider, S: DocumentStore>(
    manager: Weak<ManagerInner<P, S>>,
    id: SessionId,
    generation: u64,
    token: tokio_util::sync::CancellationToken,
    mut events: mpsc::Receiver<ProviderEvent>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let Some(manager) = SessionManager::from_weak(&manager) else {
            break;
        };
        if manager.handle_event(&id, generation, event).await == EventFlow::Stop {
            break;
        }
    }
    tracing::debug!(session_id = %id, generation, "event task finished");
}

/// Hand each due restart to its own task so one slow reconnect never delays
/// another session's recovery.
async fn recovery_loop<P: ConnectionProvider, S: DocumentStore>(
    manager: Weak<ManagerInner<P, S>>,
    mut due: mpsc::UnboundedReceiver<RestartRequest>,
) {
    while let Some(request) = due.recv().await {
        let Some(manager) = SessionManager::from_weak(&manager) else {
            break;
        };
        tokio::spawn(async move { manager.recover(request).await });
    }
}
