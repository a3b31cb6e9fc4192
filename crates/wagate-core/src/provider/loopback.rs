//! In-process connection provider.
//!
//! `LoopbackProvider` stands in for a real messaging network. It follows the
//! same event contract a network provider does (pairing challenge on a
//! credential-less connect, credential change plus `open` once paired,
//! `close` on link loss) while letting the caller drive every transition:
//! pair an account, inject inbound messages, drop links and make individual
//! operations fail.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use uuid::Uuid;
use wagate_types::address::TargetAddress;
use wagate_types::error::ProviderError;
use wagate_types::message::{AddressLookup, GroupInfo, InboundMessage, OutboundPayload, SendReceipt};
use wagate_types::session::{AccountIdentity, SessionId};

use super::{Connection, ConnectionHandle, ConnectionProvider, ConnectRequest, LinkState, ProviderEvent};

/// Outbound messages remembered per session; older ones are evicted first.
pub const SENT_HISTORY_LIMIT: usize = 64;

/// A message accepted by a loopback handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub to: TargetAddress,
    pub payload: OutboundPayload,
    pub message_id: String,
}

/// Cloneable provider; all clones share links and recorded traffic.
#[derive(Clone, Default)]
pub struct LoopbackProvider {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    links: DashMap<SessionId, Arc<Link>>,
    groups: DashMap<String, GroupInfo>,
    unregistered: DashSet<String>,
    sent: DashMap<SessionId, VecDeque<SentMessage>>,
    connects: DashMap<SessionId, u32>,
    fail_connect: AtomicBool,
    fail_send: AtomicBool,
    fail_logout: AtomicBool,
    next_id: AtomicU64,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop `link` from the live set if it is still the current one.
    fn unlink(&self, link: &Link) {
        link.open.store(false, Ordering::SeqCst);
        self.links
            .remove_if(&link.session_id, |_, current| current.id == link.id);
    }
}

struct Link {
    id: u64,
    session_id: SessionId,
    events: mpsc::Sender<ProviderEvent>,
    open: AtomicBool,
    identity: Mutex<Option<AccountIdentity>>,
}

impl Link {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_identity(&self, identity: Option<AccountIdentity>) {
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = identity;
    }

    /// Queue an event without waiting for channel capacity.
    fn emit(&self, event: ProviderEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!(session_id = %self.session_id, error = %e, "loopback event dropped");
        }
    }

    async fn deliver(&self, event: ProviderEvent) -> Result<(), ProviderError> {
        self.events.send(event).await.map_err(|_| ProviderError::Closed)
    }
}

/// Credential document produced by `LoopbackProvider::pair`.
fn credentials_for(account: &AccountIdentity) -> serde_json::Value {
    serde_json::json!({
        "account": account,
        "paired_at": Utc::now().to_rfc3339(),
    })
}

fn account_from(credentials: &serde_json::Value) -> Option<AccountIdentity> {
    let account = credentials.get("account")?;
    serde_json::from_value(account.clone()).ok()
}

impl LoopbackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn link(&self, session: &SessionId) -> Result<Arc<Link>, ProviderError> {
        self.shared
            .links
            .get(session)
            .map(|l| l.clone())
            .ok_or(ProviderError::Closed)
    }

    /// Complete pairing for the session's current link: emits a credential
    /// change followed by `open`.
    pub async fn pair(&self, session: &SessionId, account: AccountIdentity) -> Result<(), ProviderError> {
        let link = self.link(session)?;
        let credentials = credentials_for(&account);
        link.set_identity(Some(account));
        link.open.store(true, Ordering::SeqCst);
        link.deliver(ProviderEvent::CredentialsChanged(credentials)).await?;
        link.deliver(ProviderEvent::ConnectionUpdate {
            state: Some(LinkState::Open),
            pairing_challenge: None,
        })
        .await
    }

    /// Deliver an inbound message to the session's current link.
    pub async fn inject(&self, session: &SessionId, message: InboundMessage) -> Result<(), ProviderError> {
        self.link(session)?.deliver(ProviderEvent::Inbound(message)).await
    }

    /// Deliver an inbound text message from `from`, returning what was sent.
    pub async fn inject_text(
        &self,
        session: &SessionId,
        from: &str,
        text: &str,
    ) -> Result<InboundMessage, ProviderError> {
        let message = InboundMessage {
            from_self: false,
            source_id: from.to_string(),
            text: Some(text.to_string()),
            timestamp: Utc::now(),
            message_id: format!("LBIN{:08}", self.shared.next_id()),
        };
        self.inject(session, message.clone()).await?;
        Ok(message)
    }

    /// Simulate link loss: the current link closes and emits `close`.
    pub async fn drop_link(&self, session: &SessionId, reason: Option<String>) -> Result<(), ProviderError> {
        let link = self.link(session)?;
        link.open.store(false, Ordering::SeqCst);
        link.deliver(ProviderEvent::ConnectionUpdate {
            state: Some(LinkState::Close { reason }),
            pairing_challenge: None,
        })
        .await
    }

    /// The most recent messages sent through any handle of `session`,
    /// oldest first. At most `SENT_HISTORY_LIMIT` are kept.
    pub fn sent(&self, session: &SessionId) -> Vec<SentMessage> {
        self.shared
            .sent
            .get(session)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// How many times `connect` succeeded for `session`.
    pub fn connect_count(&self, session: &SessionId) -> u32 {
        self.shared.connects.get(session).map(|c| *c).unwrap_or(0)
    }

    /// Whether `session` currently has an open link.
    pub fn is_linked(&self, session: &SessionId) -> bool {
        self.shared
            .links
            .get(session)
            .is_some_and(|link| link.is_open())
    }

    pub fn add_group(&self, group: GroupInfo) {
        self.shared.groups.insert(group.id.clone(), group);
    }

    /// Make `lookup_address` report `address` as not on the network.
    pub fn mark_unregistered(&self, address: &str) {
        self.shared.unregistered.insert(address.to_string());
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.shared.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_logout(&self, fail: bool) {
        self.shared.fail_logout.store(fail, Ordering::SeqCst);
    }
}

impl ConnectionProvider for LoopbackProvider {
    type Handle = LoopbackHandle;

    async fn connect(&self, request: ConnectRequest) -> Result<Connection<LoopbackHandle>, ProviderError> {
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(ProviderError::Connect("loopback connect disabled".to_string()));
        }

        let (tx, rx) = mpsc::channel(request.event_buffer.max(4));
        let identity = request.credentials.as_ref().and_then(account_from);
        let link = Arc::new(Link {
            id: self.shared.next_id(),
            session_id: request.session_id.clone(),
            events: tx,
            open: AtomicBool::new(false),
            identity: Mutex::new(identity.clone()),
        });

        if let Some(previous) = self.shared.links.insert(request.session_id.clone(), link.clone()) {
            previous.open.store(false, Ordering::SeqCst);
        }
        *self.shared.connects.entry(request.session_id.clone()).or_insert(0) += 1;

        link.emit(ProviderEvent::ConnectionUpdate {
            state: Some(LinkState::Connecting),
            pairing_challenge: None,
        });
        if identity.is_some() {
            link.open.store(true, Ordering::SeqCst);
            link.emit(ProviderEvent::ConnectionUpdate {
                state: Some(LinkState::Open),
                pairing_challenge: None,
            });
        } else {
            link.emit(ProviderEvent::ConnectionUpdate {
                state: None,
                pairing_challenge: Some(format!("loopback-pair:{}", Uuid::now_v7())),
            });
        }

        tracing::debug!(session_id = %request.session_id, link_id = link.id, "loopback link created");
        Ok(Connection {
            handle: LoopbackHandle {
                link,
                shared: self.shared.clone(),
            },
            events: rx,
        })
    }
}

/// Handle to one loopback link.
pub struct LoopbackHandle {
    link: Arc<Link>,
    shared: Arc<Shared>,
}

impl LoopbackHandle {
    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.link.is_open() {
            Ok(())
        } else {
            Err(ProviderError::NotOpen)
        }
    }
}

impl ConnectionHandle for LoopbackHandle {
    async fn send(&self, to: &TargetAddress, payload: OutboundPayload) -> Result<SendReceipt, ProviderError> {
        if self.shared.fail_send.load(Ordering::SeqCst) {
            return Err(ProviderError::Send("loopback send disabled".to_string()));
        }
        self.ensure_open()?;

        let message_id = format!("LBOUT{:08}", self.shared.next_id());
        let mut history = self.shared.sent.entry(self.link.session_id.clone()).or_default();
        if history.len() >= SENT_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(SentMessage {
            to: to.clone(),
            payload,
            message_id: message_id.clone(),
        });
        drop(history);
        Ok(SendReceipt {
            message_id,
            to: to.to_string(),
        })
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        if self.shared.fail_logout.load(Ordering::SeqCst) {
            return Err(ProviderError::Logout("loopback logout disabled".to_string()));
        }
        self.shared.unlink(&self.link);
        self.link.set_identity(None);
        self.link.emit(ProviderEvent::ConnectionUpdate {
            state: Some(LinkState::Close {
                reason: Some("logged out".to_string()),
            }),
            pairing_challenge: None,
        });
        Ok(())
    }

    fn identity(&self) -> Option<AccountIdentity> {
        self.link
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn group_metadata(&self, group: &TargetAddress) -> Result<GroupInfo, ProviderError> {
        self.ensure_open()?;
        self.shared
            .groups
            .get(group.as_str())
            .map(|g| g.clone())
            .ok_or_else(|| ProviderError::Query(format!("group {group} not found")))
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>, ProviderError> {
        self.ensure_open()?;
        let mut groups: Vec<GroupInfo> = self.shared.groups.iter().map(|g| g.clone()).collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(groups)
    }

    async fn lookup_address(&self, address: &TargetAddress) -> Result<AddressLookup, ProviderError> {
        self.ensure_open()?;
        Ok(AddressLookup {
            address: address.to_string(),
            exists: !self.shared.unregistered.contains(address.as_str()),
        })
    }

    fn close(&self) {
        self.shared.unlink(&self.link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_types::address::normalize;

    fn request(session: &SessionId, credentials: Option<serde_json::Value>) -> ConnectRequest {
        ConnectRequest {
            session_id: session.clone(),
            credentials,
            event_buffer: 16,
        }
    }

    fn account() -> AccountIdentity {
        AccountIdentity {
            id: "628111@s.whatsapp.net".to_string(),
            name: Some("Shop".to_string()),
        }
    }

    #[tokio::test]
    async fn test_connect_without_credentials_issues_pairing_challenge() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let mut conn = provider.connect(request(&id, None)).await.unwrap();

        assert_eq!(
            conn.events.recv().await.unwrap(),
            ProviderEvent::ConnectionUpdate {
                state: Some(LinkState::Connecting),
                pairing_challenge: None
            }
        );
        match conn.events.recv().await.unwrap() {
            ProviderEvent::ConnectionUpdate {
                pairing_challenge: Some(payload),
                ..
            } => assert!(payload.starts_with("loopback-pair:")),
            other => panic!("expected pairing challenge, got {other:?}"),
        }
        assert!(conn.handle.identity().is_none());
        assert!(!provider.is_linked(&id));
    }

    #[tokio::test]
    async fn test_pair_emits_credentials_then_open() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let mut conn = provider.connect(request(&id, None)).await.unwrap();
        conn.events.recv().await.unwrap();
        conn.events.recv().await.unwrap();

        provider.pair(&id, account()).await.unwrap();
        let creds = match conn.events.recv().await.unwrap() {
            ProviderEvent::CredentialsChanged(v) => v,
            other => panic!("expected credentials, got {other:?}"),
        };
        assert_eq!(account_from(&creds), Some(account()));
        assert_eq!(
            conn.events.recv().await.unwrap(),
            ProviderEvent::ConnectionUpdate {
                state: Some(LinkState::Open),
                pairing_challenge: None
            }
        );
        assert_eq!(conn.handle.identity(), Some(account()));
    }

    #[tokio::test]
    async fn test_connect_with_credentials_opens_directly() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let mut conn = provider
            .connect(request(&id, Some(credentials_for(&account()))))
            .await
            .unwrap();
        conn.events.recv().await.unwrap();
        assert_eq!(
            conn.events.recv().await.unwrap(),
            ProviderEvent::ConnectionUpdate {
                state: Some(LinkState::Open),
                pairing_challenge: None
            }
        );
        assert!(provider.is_linked(&id));
        assert_eq!(provider.connect_count(&id), 1);
    }

    #[tokio::test]
    async fn test_send_records_traffic_and_honors_failures() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let conn = provider
            .connect(request(&id, Some(credentials_for(&account()))))
            .await
            .unwrap();
        let to = normalize("081234567").unwrap();

        let receipt = conn
            .handle
            .send(&to, OutboundPayload::Text("hi".to_string()))
            .await
            .unwrap();
        assert_eq!(receipt.to, "6281234567@s.whatsapp.net");
        assert_eq!(provider.sent(&id).len(), 1);

        provider.set_fail_send(true);
        let err = conn
            .handle
            .send(&to, OutboundPayload::Text("again".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Send(_)));
        assert_eq!(provider.sent(&id).len(), 1);
    }

    #[tokio::test]
    async fn test_sent_history_keeps_only_recent_messages() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let conn = provider
            .connect(request(&id, Some(credentials_for(&account()))))
            .await
            .unwrap();
        let to = normalize("081234567").unwrap();

        for i in 0..SENT_HISTORY_LIMIT + 10 {
            conn.handle
                .send(&to, OutboundPayload::Text(format!("msg {i}")))
                .await
                .unwrap();
        }
        let sent = provider.sent(&id);
        assert_eq!(sent.len(), SENT_HISTORY_LIMIT);
        assert_eq!(sent[0].payload, OutboundPayload::Text("msg 10".to_string()));
        assert_eq!(
            sent[SENT_HISTORY_LIMIT - 1].payload,
            OutboundPayload::Text(format!("msg {}", SENT_HISTORY_LIMIT + 9))
        );
    }

    #[tokio::test]
    async fn test_send_on_unpaired_link_is_not_open() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let conn = provider.connect(request(&id, None)).await.unwrap();
        let err = conn
            .handle
            .send(&normalize("0812").unwrap(), OutboundPayload::Text("x".into()))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::NotOpen);
    }

    #[tokio::test]
    async fn test_drop_link_emits_close() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let mut conn = provider
            .connect(request(&id, Some(credentials_for(&account()))))
            .await
            .unwrap();
        conn.events.recv().await.unwrap();
        conn.events.recv().await.unwrap();

        provider.drop_link(&id, Some("network".into())).await.unwrap();
        assert_eq!(
            conn.events.recv().await.unwrap(),
            ProviderEvent::ConnectionUpdate {
                state: Some(LinkState::Close {
                    reason: Some("network".into())
                }),
                pairing_challenge: None
            }
        );
        assert!(!provider.is_linked(&id));
    }

    #[tokio::test]
    async fn test_close_of_stale_handle_keeps_new_link() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        let creds = Some(credentials_for(&account()));
        let old = provider.connect(request(&id, creds.clone())).await.unwrap();
        let _new = provider.connect(request(&id, creds)).await.unwrap();

        old.handle.close();
        assert!(provider.is_linked(&id));
        assert_eq!(provider.connect_count(&id), 2);
    }

    #[tokio::test]
    async fn test_group_queries() {
        let provider = LoopbackProvider::new();
        let id = SessionId::parse("s1").unwrap();
        provider.add_group(GroupInfo {
            id: "120363@g.us".to_string(),
            subject: "Team".to_string(),
            owner: None,
            participants: vec![],
        });
        provider.mark_unregistered("6289999@s.whatsapp.net");
        let conn = provider
            .connect(request(&id, Some(credentials_for(&account()))))
            .await
            .unwrap();

        let group = normalize("120363@g.us").unwrap();
        assert_eq!(conn.handle.group_metadata(&group).await.unwrap().subject, "Team");
        assert_eq!(conn.handle.list_groups().await.unwrap().len(), 1);

        let missing = normalize("999@g.us").unwrap();
        assert!(matches!(
            conn.handle.group_metadata(&missing).await,
            Err(ProviderError::Query(_))
        ));

        let lookup = conn
            .handle
            .lookup_address(&normalize("089999").unwrap())
            .await
            .unwrap();
        assert!(!lookup.exists);
    }

    #[tokio::test]
    async fn test_connect_failure_toggle() {
        let provider = LoopbackProvider::new();
        provider.set_fail_connect(true);
        let id = SessionId::parse("s1").unwrap();
        assert!(matches!(
            provider.connect(request(&id, None)).await,
            Err(ProviderError::Connect(_))
        ));
        assert_eq!(provider.connect_count(&id), 0);
    }
}
