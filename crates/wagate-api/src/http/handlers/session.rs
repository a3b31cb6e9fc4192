//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                - Start a session
//! - GET  /api/v1/sessions                - List running sessions
//! - GET  /api/v1/sessions/{id}           - Connection status
//! - GET  /api/v1/sessions/{id}/pairing   - Pending pairing challenge
//! - POST /api/v1/sessions/{id}/reset     - Discard credentials and restart
//! - POST /api/v1/sessions/{id}/logout    - Log out and remove the session
//! - GET  /api/v1/sessions/{id}/inbox     - Recorded inbound messages

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use wagate_types::message::InboxEntry;
use wagate_types::session::{PairingChallenge, SessionStatus};

use super::parse_session_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for starting a session.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub session_id: String,
    pub logged_out: bool,
}

/// POST /api/v1/sessions - Start a session.
pub async fn start_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(body): ApiJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionStatus>>), AppError> {
    let start = Instant::now();
    let id = parse_session_id(&body.session_id)?;

    let status = state.gateway.start_session(&id).await?;

    let resp = ApiResponse::timed(status, start)
        .with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("pairing", &format!("/api/v1/sessions/{id}/pairing"));
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/sessions - List running sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<SessionStatus>>>, AppError> {
    let start = Instant::now();
    let sessions = state.gateway.list_sessions();
    Ok(Json(
        ApiResponse::timed(sessions, start).with_link("self", "/api/v1/sessions"),
    ))
}

/// GET /api/v1/sessions/{id} - Connection status.
pub async fn get_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionStatus>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let status = state.gateway.get_status(&id)?;
    Ok(Json(
        ApiResponse::timed(status, start).with_link("self", &format!("/api/v1/sessions/{id}")),
    ))
}

/// GET /api/v1/sessions/{id}/pairing - Pending pairing challenge.
pub async fn get_pairing(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<PairingChallenge>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let challenge = state.gateway.get_pairing_challenge(&id)?;
    Ok(Json(ApiResponse::timed(challenge, start)))
}

/// POST /api/v1/sessions/{id}/reset - Discard credentials and restart.
pub async fn reset_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionStatus>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let status = state.gateway.reset_session(&id).await?;
    Ok(Json(
        ApiResponse::timed(status, start)
            .with_link("pairing", &format!("/api/v1/sessions/{id}/pairing")),
    ))
}

/// POST /api/v1/sessions/{id}/logout - Log out and remove the session.
pub async fn logout_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<LogoutResponse>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    state.gateway.logout(&id).await?;
    Ok(Json(ApiResponse::timed(
        LogoutResponse {
            session_id: id.to_string(),
            logged_out: true,
        },
        start,
    )))
}

/// GET /api/v1/sessions/{id}/inbox - Recorded inbound messages in arrival order.
pub async fn get_inbox(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<InboxEntry>>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let entries = state.gateway.get_inbox(&id).await?;
    Ok(Json(ApiResponse::timed(entries, start)))
}
