use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Maximum length of a caller-chosen session identifier.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Caller-chosen, stable identifier of a tenant session.
///
/// Session IDs double as document keys in the durable store, so they are
/// restricted to ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw session identifier.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::InvalidSessionId(
                "session id cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_SESSION_ID_LEN {
            return Err(GatewayError::InvalidSessionId(format!(
                "session id exceeds {MAX_SESSION_ID_LEN} characters"
            )));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(GatewayError::InvalidSessionId(format!(
                "invalid character '{bad}' in session id"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Lifecycle phase of a session.
///
/// `Starting -> Authenticating -> Connected -> Disconnected -> {Starting | Terminated}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Starting,
    Authenticating,
    Connected,
    Disconnected,
    Terminated,
}

impl SessionPhase {
    /// Collapse the lifecycle phase into the coarse connection status.
    pub fn connection_status(self) -> ConnectionStatus {
        match self {
            SessionPhase::Starting | SessionPhase::Authenticating => ConnectionStatus::Pending,
            SessionPhase::Connected => ConnectionStatus::Connected,
            SessionPhase::Disconnected | SessionPhase::Terminated => {
                ConnectionStatus::Disconnected
            }
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Starting => write!(f, "starting"),
            SessionPhase::Authenticating => write!(f, "authenticating"),
            SessionPhase::Connected => write!(f, "connected"),
            SessionPhase::Disconnected => write!(f, "disconnected"),
            SessionPhase::Terminated => write!(f, "terminated"),
        }
    }
}

/// Coarse connection status reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Pending => write!(f, "pending"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// The account a connected session is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Network address of the account (e.g. `628123456789@s.whatsapp.net`).
    pub id: String,
    /// Display name, when the network reports one.
    pub name: Option<String>,
}

/// Short-lived payload a human scans or types to authenticate a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingChallenge {
    pub payload: String,
    pub issued_at: DateTime<Utc>,
}

/// Point-in-time view of a session, as returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub status: ConnectionStatus,
    pub phase: SessionPhase,
    pub identity: Option<AccountIdentity>,
    /// Whether a pairing challenge is waiting to be scanned.
    pub pairing_pending: bool,
    /// Consecutive automatic restarts since the session was last open.
    pub restart_attempts: u32,
    pub updated_at: DateTime<Utc>,
}

/// Persisted authentication state of one session.
///
/// The credential payload is opaque to the gateway; only the connection
/// provider interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub session_id: SessionId,
    pub credentials: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
