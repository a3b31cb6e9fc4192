//! Group and address query handlers.
//!
//! Endpoints:
//! - GET /api/v1/sessions/{id}/groups             - Groups the account is in
//! - GET /api/v1/sessions/{id}/groups/{group_id}  - Metadata of one group
//! - GET /api/v1/sessions/{id}/addresses/{raw}    - Is an address registered

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;

use wagate_types::message::{AddressLookup, GroupInfo};

use super::parse_session_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/sessions/{id}/groups
pub async fn list_groups(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<GroupInfo>>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let groups = state.gateway.list_groups(&id).await?;
    Ok(Json(ApiResponse::timed(groups, start)))
}

/// GET /api/v1/sessions/{id}/groups/{group_id}
pub async fn get_group(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((session_id, group_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<GroupInfo>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let group = state.gateway.group_metadata(&id, &group_id).await?;
    Ok(Json(ApiResponse::timed(group, start)))
}

/// GET /api/v1/sessions/{id}/addresses/{raw}
pub async fn check_address(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((session_id, raw)): Path<(String, String)>,
) -> Result<Json<ApiResponse<AddressLookup>>, AppError> {
    let start = Instant::now();
    let id = parse_session_id(&session_id)?;
    let lookup = state.gateway.check_address(&id, &raw).await?;
    Ok(Json(ApiResponse::timed(lookup, start)))
}
