//! Outbound message HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions/{id}/messages - Send a text message
//! - POST /api/v1/sessions/{id}/media    - Send a base64-encoded attachment

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use wagate_types::message::{MediaPayload, SendReceipt};

use super::parse_session_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    /// Raw phone number or network address.
    pub to: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMediaRequest {
    pub to: String,
    pub mime: String,
    /// Attachment bytes, standard base64.
    pub data: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// POST /api/v1/sessions/{id}/messages - Send a text message.
pub async fn send_text(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
    ApiJson(body): ApiJson<SendTextRequest>,
) -> Result<Json<ApiResponse<SendReceipt>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let receipt = state.gateway.send_text(&id, &body.to, &body.text).await?;
    Ok(Json(ApiResponse::timed(receipt, start)))
}

/// POST /api/v1/sessions/{id}/media - Send a base64-encoded attachment.
pub async fn send_media(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
    ApiJson(body): ApiJson<SendMediaRequest>,
) -> Result<Json<ApiResponse<SendReceipt>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let data = STANDARD
        .decode(body.data.trim())
        .map_err(|e| AppError::Validation(format!("data is not valid base64: {e}")))?;

    let media = MediaPayload {
        data,
        mime_type: body.mime,
        caption: body.caption.filter(|c| !c.is_empty()),
    };
    let receipt = state.gateway.send_media(&id, &body.to, media).await?;
    Ok(Json(ApiResponse::timed(receipt, start)))
}
