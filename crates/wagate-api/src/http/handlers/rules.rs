//! Auto-reply rule handlers.
//!
//! Endpoints:
//! - GET /api/v1/auto-reply/rules - Current rule set
//! - PUT /api/v1/auto-reply/rules - Replace the rule set

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use wagate_types::rule::AutoReplyRule;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/auto-reply/rules
pub async fn get_rules(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<AutoReplyRule>>>, AppError> {
    let start = Instant::now();
    let rules = state.gateway.rules().as_ref().clone();
    Ok(Json(ApiResponse::timed(rules, start)))
}

/// PUT /api/v1/auto-reply/rules - Replace the whole rule set.
pub async fn set_rules(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(rules): ApiJson<Vec<AutoReplyRule>>,
) -> Result<Json<ApiResponse<Vec<AutoReplyRule>>>, AppError> {
    let start = Instant::now();
    let rules = state.gateway.set_rules(rules).await?;
    tracing::info!(count = rules.len(), "auto-reply rules replaced");
    Ok(Json(ApiResponse::timed(rules.as_ref().clone(), start)))
}
