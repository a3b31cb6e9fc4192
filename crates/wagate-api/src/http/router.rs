//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Sessions
        .route(
            "/sessions",
            post(handlers::session::start_session).get(handlers::session::list_sessions),
        )
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route("/sessions/{id}/pairing", get(handlers::session::get_pairing))
        .route("/sessions/{id}/reset", post(handlers::session::reset_session))
        .route("/sessions/{id}/logout", post(handlers::session::logout_session))
        .route("/sessions/{id}/inbox", get(handlers::session::get_inbox))
        // Outbound
        .route("/sessions/{id}/messages", post(handlers::message::send_text))
        .route("/sessions/{id}/media", post(handlers::message::send_media))
        // Groups and addresses
        .route("/sessions/{id}/groups", get(handlers::groups::list_groups))
        .route(
            "/sessions/{id}/groups/{group_id}",
            get(handlers::groups::get_group),
        )
        .route(
            "/sessions/{id}/addresses/{raw}",
            get(handlers::groups::check_address),
        )
        // Auto-reply
        .route(
            "/auto-reply/rules",
            get(handlers::rules::get_rules).put(handlers::rules::set_rules),
        )
        // Event stream
        .route("/events", get(handlers::events::stream_events))
        // Loopback provider control
        .route(
            "/loopback/sessions/{id}/pair",
            post(handlers::loopback::pair),
        )
        .route(
            "/loopback/sessions/{id}/inbound",
            post(handlers::loopback::inbound),
        )
        .route(
            "/loopback/sessions/{id}/drop",
            post(handlers::loopback::drop_link),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use wagate_core::event::GatewayEvent;
    use wagate_types::config::GatewayConfig;
    use wagate_types::session::{SessionId, SessionPhase};

    use super::*;

    async fn test_state(config: GatewayConfig) -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(dir.path().to_path_buf(), config).await.unwrap();
        (state, dir)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_phase(state: &AppState, id: &str, phase: SessionPhase) {
        let id = SessionId::parse(id).unwrap();
        let session = state.gateway.registry().get(&id).unwrap();
        let mut rx = session.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.phase == phase))
            .await
            .expect("timed out waiting for phase")
            .unwrap();
    }

    async fn connected_session(state: &AppState, router: &Router, id: &str) {
        let resp = send(router, "POST", "/api/v1/sessions", Some(json!({"session_id": id}))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        wait_for_phase(state, id, SessionPhase::Authenticating).await;

        let resp = send(
            router,
            "POST",
            &format!("/api/v1/loopback/sessions/{id}/pair"),
            Some(json!({"account": "081234567", "name": "Shop"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        wait_for_phase(state, id, SessionPhase::Connected).await;
    }

    #[tokio::test]
    async fn test_health_no_auth() {
        let mut config = GatewayConfig::default();
        config.server.api_key = Some("secret".to_string());
        let (state, _dir) = test_state(config).await;
        let router = build_router(state);

        let resp = send(&router, "GET", "/health", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let mut config = GatewayConfig::default();
        config.server.api_key = Some("secret".to_string());
        let (state, _dir) = test_state(config).await;
        let router = build_router(state);

        let resp = send(&router, "GET", "/api/v1/sessions", None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/sessions")
            .header("x-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/api/v1/sessions")
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_start_session_and_pairing_flow() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());

        let resp = send(&router, "POST", "/api/v1/sessions", Some(json!({"session_id": "s1"}))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await["data"]["session_id"], "s1");

        wait_for_phase(&state, "s1", SessionPhase::Authenticating).await;
        let resp = send(&router, "GET", "/api/v1/sessions/s1/pairing", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let payload = body_json(resp).await["data"]["payload"].as_str().unwrap().to_string();
        assert!(payload.starts_with("loopback-pair:"));

        let resp = send(&router, "GET", "/api/v1/sessions/s1", None).await;
        assert_eq!(body_json(resp).await["data"]["status"], "pending");

        let resp = send(&router, "POST", "/api/v1/sessions", Some(json!({"session_id": "s1"}))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "SESSION_EXISTS");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state);

        for (method, uri) in [
            ("GET", "/api/v1/sessions/ghost"),
            ("GET", "/api/v1/sessions/ghost/inbox"),
            ("POST", "/api/v1/sessions/ghost/logout"),
            ("POST", "/api/v1/sessions/ghost/reset"),
        ] {
            let resp = send(&router, method, uri, None).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_validation_error() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/sessions")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = router.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "VALIDATION_ERROR");

        let resp = send(&router, "POST", "/api/v1/sessions", Some(json!({"session_id": "a b"}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "INVALID_SESSION_ID");
    }

    #[tokio::test]
    async fn test_send_requires_connected_session() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());

        send(&router, "POST", "/api/v1/sessions", Some(json!({"session_id": "s1"}))).await;
        wait_for_phase(&state, "s1", SessionPhase::Authenticating).await;

        let resp = send(
            &router,
            "POST",
            "/api/v1/sessions/s1/messages",
            Some(json!({"to": "081234567", "text": "hi"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "SESSION_NOT_CONNECTED");
    }

    #[tokio::test]
    async fn test_send_text_and_media() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());
        connected_session(&state, &router, "s1").await;

        let resp = send(
            &router,
            "POST",
            "/api/v1/sessions/s1/messages",
            Some(json!({"to": "0812-3456-789", "text": "hello"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["to"], "628123456789@s.whatsapp.net");

        let resp = send(
            &router,
            "POST",
            "/api/v1/sessions/s1/media",
            Some(json!({"to": "081234567", "mime": "image/png", "data": "iVBORw0K", "caption": "pic"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let id = SessionId::parse("s1").unwrap();
        assert_eq!(state.loopback().sent(&id).len(), 2);

        let resp = send(
            &router,
            "POST",
            "/api/v1/sessions/s1/media",
            Some(json!({"to": "081234567", "mime": "image/png", "data": "%%%"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &router,
            "POST",
            "/api/v1/sessions/s1/messages",
            Some(json!({"to": "+1 555 0100", "text": "hello"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "INVALID_ADDRESS");
    }

    #[tokio::test]
    async fn test_rules_and_auto_reply_through_inbox() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());
        connected_session(&state, &router, "s1").await;

        let resp = send(
            &router,
            "PUT",
            "/api/v1/auto-reply/rules",
            Some(json!([{"keyword": "price", "reply": "10k"}])),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&router, "GET", "/api/v1/auto-reply/rules", None).await;
        assert_eq!(body_json(resp).await["data"][0]["keyword"], "price");

        let mut events = state.gateway.subscribe();
        let resp = send(
            &router,
            "POST",
            "/api/v1/loopback/sessions/s1/inbound",
            Some(json!({"from": "0899999999", "text": "What is the PRICE?"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let GatewayEvent::AutoReplySent { .. } = events.recv().await.unwrap() {
                    break;
                }
            }
        })
        .await
        .expect("auto-reply not sent");

        let resp = send(&router, "GET", "/api/v1/sessions/s1/inbox", None).await;
        let inbox = body_json(resp).await;
        assert_eq!(inbox["data"][0]["from"], "62899999999@s.whatsapp.net");
        assert_eq!(inbox["data"][0]["text"], "What is the PRICE?");

        let id = SessionId::parse("s1").unwrap();
        let sent = state.loopback().sent(&id);
        assert_eq!(sent.last().unwrap().to.as_str(), "62899999999@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_invalid_rules_rejected() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state);

        let resp = send(
            &router,
            "PUT",
            "/api/v1/auto-reply/rules",
            Some(json!([{"keyword": "", "reply": "x"}])),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());
        connected_session(&state, &router, "s1").await;

        let resp = send(&router, "POST", "/api/v1/sessions/s1/logout", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["logged_out"], true);

        let resp = send(&router, "GET", "/api/v1/sessions/s1", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_group_queries() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state.clone());
        connected_session(&state, &router, "s1").await;

        let resp = send(&router, "GET", "/api/v1/sessions/s1/groups", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_json(resp).await["data"].is_array());

        let resp = send(&router, "GET", "/api/v1/sessions/s1/groups/081234567", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&router, "GET", "/api/v1/sessions/s1/addresses/081234567", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["exists"], true);
    }

    #[tokio::test]
    async fn test_events_endpoint_streams_sse() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let router = build_router(state);

        let resp = send(&router, "GET", "/api/v1/events?session_id=s1", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));

        let resp = send(&router, "GET", "/api/v1/events?session_id=a%20b", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_events_stream_ends_on_shutdown() {
        let (state, _dir) = test_state(GatewayConfig::default()).await;
        let shutdown = state.shutdown.clone();
        let router = build_router(state);

        let resp = send(&router, "GET", "/api/v1/events", None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        shutdown.cancel();
        let body = tokio::time::timeout(
            Duration::from_secs(5),
            axum::body::to_bytes(resp.into_body(), usize::MAX),
        )
        .await
        .expect("event stream did not end after shutdown");
        assert!(body.is_ok());
    }
}
