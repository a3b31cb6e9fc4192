use thiserror::Error;

use crate::session::SessionId;

/// Errors surfaced by the gateway's core operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("session '{0}' already exists")]
    AlreadyExists(SessionId),

    #[error("session '{0}' not found")]
    NotFound(SessionId),

    #[error("session '{0}' is not connected")]
    NotConnected(SessionId),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid target address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("invalid auto-reply rules: {0}")]
    InvalidRules(#[from] RuleError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("no pairing challenge available for session '{0}'")]
    PairingUnavailable(SessionId),

    #[error("failed to connect: {0}")]
    ConnectFailed(ProviderError),

    #[error("logout failed: {0}")]
    LogoutFailed(ProviderError),

    #[error("send failed: {0}")]
    SendFailed(ProviderError),

    #[error("provider query failed: {0}")]
    QueryFailed(ProviderError),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

/// Errors from target address normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address contains no digits")]
    NoDigits,

    #[error("number '{digits}' must start with {country_code} or {trunk_prefix}")]
    UnsupportedPrefix {
        digits: String,
        country_code: String,
        trunk_prefix: String,
    },

    #[error("number '{0}' has no subscriber digits after the country code")]
    TooShort(String),

    #[error("malformed network address '{0}'")]
    MalformedAddress(String),

    #[error("'{0}' is not a group address")]
    NotAGroup(String),
}

/// Errors reported by a connection provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection is not open")]
    NotOpen,

    #[error("send rejected: {0}")]
    Send(String),

    #[error("logout rejected: {0}")]
    Logout(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection closed")]
    Closed,
}

/// Validation errors for auto-reply rule sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule {index} has an empty keyword")]
    EmptyKeyword { index: usize },

    #[error("rule {index} has an empty reply")]
    EmptyReply { index: usize },
}

/// Errors from durable store operations (used by trait definitions in wagate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid document key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let id = SessionId::parse("s1").unwrap();
        let err = GatewayError::AlreadyExists(id);
        assert_eq!(err.to_string(), "session 's1' already exists");
    }

    #[test]
    fn test_address_error_converts() {
        let err: GatewayError = AddressError::NoDigits.into();
        assert!(matches!(err, GatewayError::InvalidAddress(AddressError::NoDigits)));
        assert!(err.to_string().contains("no digits"));
    }

    #[test]
    fn test_send_failed_wraps_provider_error() {
        let err = GatewayError::SendFailed(ProviderError::Send("timeout".to_string()));
        assert_eq!(err.to_string(), "send failed: send rejected: timeout");
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
