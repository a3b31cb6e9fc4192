//! HTTP request handlers for the REST API.

pub mod events;
pub mod groups;
pub mod loopback;
pub mod message;
pub mod rules;
pub mod session;

use wagate_types::session::SessionId;

use crate::http::error::AppError;

/// Parse a session id from a path or body field.
pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    Ok(SessionId::parse(raw)?)
}
