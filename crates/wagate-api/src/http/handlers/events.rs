//! SSE stream of gateway events.
//!
//! GET /api/v1/events[?session_id=...]
//!
//! Each SSE event is named after the gateway event kind (`connected`,
//! `message_recorded`, ...) and carries the event as JSON. A subscriber
//! that falls behind receives a `lagged` event with the number of skipped
//! events and keeps streaming. The stream ends when the server shuts down.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::Stream;

use super::parse_session_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only stream events for this session.
    pub session_id: Option<String>,
}

/// GET /api/v1/events
pub async fn stream_events(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let filter = query
        .session_id
        .as_deref()
        .map(parse_session_id)
        .transpose()?;
    let mut rx = state.gateway.subscribe();
    let shutdown = state.shutdown.clone();

    let sse_stream = async_stream::stream! {
        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(event) => {
                    if filter.as_ref().is_some_and(|id| event.session_id() != id) {
                        continue;
                    }
                    match Event::default().event(event.kind()).json_data(&event) {
                        Ok(sse) => yield Ok::<_, Infallible>(sse),
                        Err(e) => tracing::warn!(error = %e, "failed to encode gateway event"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    let data = serde_json::json!({ "skipped": skipped });
                    yield Ok(Event::default().event("lagged").data(data.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
