//! Control endpoints for the in-process loopback provider.
//!
//! They stand in for the phone side of a link: completing pairing,
//! delivering inbound messages and dropping the connection.
//!
//! Endpoints:
//! - POST /api/v1/loopback/sessions/{id}/pair    - Complete pairing
//! - POST /api/v1/loopback/sessions/{id}/inbound - Deliver an inbound message
//! - POST /api/v1/loopback/sessions/{id}/drop    - Close the link (`?reason=`)

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wagate_types::error::ProviderError;
use wagate_types::message::InboundMessage;
use wagate_types::session::{AccountIdentity, SessionId};

use super::parse_session_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PairRequest {
    /// Phone number or address of the account completing the pairing.
    pub account: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundRequest {
    pub from: String,
    pub text: Option<String>,
    #[serde(default)]
    pub from_self: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DropQuery {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Delivered {
    pub session_id: String,
    pub delivered: bool,
}

fn provider_error(id: &SessionId, err: ProviderError) -> AppError {
    match err {
        ProviderError::Closed => {
            AppError::Validation(format!("session '{id}' has no live loopback link"))
        }
        other => AppError::Internal(other.to_string()),
    }
}

fn delivered(id: &SessionId, start: Instant) -> Json<ApiResponse<Delivered>> {
    Json(ApiResponse::timed(
        Delivered {
            session_id: id.to_string(),
            delivered: true,
        },
        start,
    ))
}

/// POST /api/v1/loopback/sessions/{id}/pair
pub async fn pair(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
    ApiJson(body): ApiJson<PairRequest>,
) -> Result<Json<ApiResponse<Delivered>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    state.gateway.get_status(&id)?;

    let address = state.gateway.numbering_plan().normalize(&body.account)?;
    let account = AccountIdentity {
        id: address.to_string(),
        name: body.name,
    };
    state
        .loopback()
        .pair(&id, account)
        .await
        .map_err(|e| provider_error(&id, e))?;
    Ok(delivered(&id, start))
}

/// POST /api/v1/loopback/sessions/{id}/inbound
pub async fn inbound(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
    ApiJson(body): ApiJson<InboundRequest>,
) -> Result<Json<ApiResponse<Delivered>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    state.gateway.get_status(&id)?;

    let source = state.gateway.numbering_plan().normalize(&body.from)?;
    let message = InboundMessage {
        from_self: body.from_self,
        source_id: source.to_string(),
        text: body.text,
        timestamp: Utc::now(),
        message_id: Uuid::now_v7().simple().to_string().to_uppercase(),
    };
    state
        .loopback()
        .inject(&id, message)
        .await
        .map_err(|e| provider_error(&id, e))?;
    Ok(delivered(&id, start))
}

/// POST /api/v1/loopback/sessions/{id}/drop
pub async fn drop_link(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
    Query(query): Query<DropQuery>,
) -> Result<Json<ApiResponse<Delivered>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    state.gateway.get_status(&id)?;

    state
        .loopback()
        .drop_link(&id, query.reason)
        .await
        .map_err(|e| provider_error(&id, e))?;
    Ok(delivered(&id, start))
}
