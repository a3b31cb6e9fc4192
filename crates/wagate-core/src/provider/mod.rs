//! Connection provider port.
//!
//! A provider performs the network handshake for one session and hands back
//! a handle for outbound calls plus a single ordered event channel. The
//! lifecycle manager consumes that channel from one task per session.

pub mod loopback;

use tokio::sync::mpsc;
use wagate_types::address::TargetAddress;
use wagate_types::error::ProviderError;
use wagate_types::message::{AddressLookup, GroupInfo, InboundMessage, OutboundPayload, SendReceipt};
use wagate_types::session::{AccountIdentity, SessionId};

/// Transport-level state reported by a connection update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Close { reason: Option<String> },
}

/// Events emitted by a live connection, in the order they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The provider rotated its authentication state; persist the snapshot.
    CredentialsChanged(serde_json::Value),
    ConnectionUpdate {
        state: Option<LinkState>,
        pairing_challenge: Option<String>,
    },
    Inbound(InboundMessage),
}

/// Parameters for establishing a connection.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub session_id: SessionId,
    /// Previously persisted credentials; None forces pairing.
    pub credentials: Option<serde_json::Value>,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

/// A freshly established connection.
pub struct Connection<H> {
    pub handle: H,
    pub events: mpsc::Receiver<ProviderEvent>,
}

/// Outbound side of one live connection.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ConnectionHandle: Send + Sync + 'static {
    fn send(
        &self,
        to: &TargetAddress,
        payload: OutboundPayload,
    ) -> impl std::future::Future<Output = Result<SendReceipt, ProviderError>> + Send;

    /// Log the account out on the network, invalidating its credentials.
    fn logout(&self) -> impl std::future::Future<Output = Result<(), ProviderError>> + Send;

    /// The authenticated account, once the connection is open.
    fn identity(&self) -> Option<AccountIdentity>;

    fn group_metadata(
        &self,
        group: &TargetAddress,
    ) -> impl std::future::Future<Output = Result<GroupInfo, ProviderError>> + Send;

    fn list_groups(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<GroupInfo>, ProviderError>> + Send;

    fn lookup_address(
        &self,
        address: &TargetAddress,
    ) -> impl std::future::Future<Output = Result<AddressLookup, ProviderError>> + Send;

    /// Tear down the transport without logging out. Emits no further events.
    fn close(&self);
}

/// Factory for connections.
pub trait ConnectionProvider: Send + Sync + 'static {
    type Handle: ConnectionHandle;

    fn connect(
        &self,
        request: ConnectRequest,
    ) -> impl std::future::Future<Output = Result<Connection<Self::Handle>, ProviderError>> + Send;
}
