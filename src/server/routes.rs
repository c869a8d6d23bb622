//! HTTP routes
//!
//! `/stream` registers a client and turns its buffer into an SSE response.
//! The remaining routes expose status and introspection.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::sse::to_sse_event;
use super::state::AppState;
use crate::manager::ClientStream;
use crate::registry::{ClientOptions, EventId, TopicFilter};
use crate::stats::ManagerStats;

const LAST_EVENT_ID: &str = "last-event-id";

/// Query parameters accepted by `/stream`
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Comma separated topics; absent or empty means all
    pub topics: Option<String>,
    pub name: Option<String>,
    /// Comma separated tags
    pub tags: Option<String>,
    /// Resume token for clients that cannot set `Last-Event-ID`
    pub last_event_id: Option<String>,
}

impl StreamQuery {
    fn into_options(self, headers: &HeaderMap) -> ClientOptions {
        let resume = headers
            .get(LAST_EVENT_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or(self.last_event_id)
            .filter(|token| !token.trim().is_empty());

        ClientOptions {
            topics: self
                .topics
                .as_deref()
                .map(TopicFilter::parse_list)
                .unwrap_or_default(),
            name: self.name.filter(|name| !name.is_empty()),
            tags: self
                .tags
                .as_deref()
                .map(|tags| {
                    tags.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            last_event_id: resume.map(EventId::from),
        }
    }
}

/// Assemble the router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stream", get(stream_events))
        .route("/clients", get(clients))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// GET /: service summary
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "clients": state.manager.client_count().await,
        "endpoints": {
            "stream": "/stream",
            "health": "/health",
            "clients": "/clients",
        },
    }))
}

/// GET /health: liveness check with producer state
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sample = state.producers.sample.lock().await.is_running();
    let heartbeat = state.producers.heartbeat.lock().await.is_running();

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "connected_clients": state.manager.client_count().await,
        "history_size": state.manager.history_size().await,
        "producers": {
            "event_producer": producer_state(sample),
            "heartbeat_producer": producer_state(heartbeat),
        },
    }))
}

/// GET /clients: manager statistics and client listing
pub async fn clients(State(state): State<Arc<AppState>>) -> Json<ManagerStats> {
    Json(state.manager.stats().await)
}

/// GET /stream: server-sent event stream for one client
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Response {
    let options = query.into_options(&headers);

    let client = match state.manager.subscribe(options).await {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Stream registration rejected");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    tracing::info!(
        client_id = %client.id(),
        resume = ?client.resume(),
        "Client streaming"
    );

    let events = futures_util::stream::unfold(client, next_sse_event);
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.keep_alive));

    (
        [
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
        .into_response()
}

async fn next_sse_event(
    mut client: ClientStream,
) -> Option<(Result<axum::response::sse::Event, Infallible>, ClientStream)> {
    match client.next_event().await {
        Some(event) => Some((Ok(to_sse_event(&event)), client)),
        None => {
            tracing::info!(
                client_id = %client.id(),
                events_delivered = client.record().events_delivered(),
                "Client stream closed"
            );
            None
        }
    }
}

fn producer_state(running: bool) -> &'static str {
    if running {
        "running"
    } else {
        "stopped"
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::manager::StreamManager;
    use crate::registry::RegistryConfig;
    use crate::server::config::ServerConfig;

    fn state(registry: RegistryConfig) -> Arc<AppState> {
        let manager = Arc::new(StreamManager::with_config(registry));
        Arc::new(AppState::new(
            ServerConfig::default().disable_producers(),
            manager,
        ))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_stream_query_options() {
        let mut headers = HeaderMap::new();
        headers.insert(LAST_EVENT_ID, "from-header".parse().unwrap());

        let query = StreamQuery {
            topics: Some("data, alert".to_string()),
            name: Some("dash".to_string()),
            tags: Some("a,,b".to_string()),
            last_event_id: Some("from-query".to_string()),
        };
        let options = query.into_options(&headers);

        assert_eq!(options.topics.iter().collect::<Vec<_>>(), vec!["alert", "data"]);
        assert_eq!(options.name.as_deref(), Some("dash"));
        assert_eq!(options.tags, vec!["a", "b"]);
        assert_eq!(options.last_event_id, Some(EventId::from("from-header")));
    }

    #[test]
    fn test_stream_query_defaults() {
        let options = StreamQuery {
            last_event_id: Some(" ".to_string()),
            ..Default::default()
        }
        .into_options(&HeaderMap::new());

        assert!(options.topics.is_all());
        assert!(options.name.is_none());
        assert!(options.tags.is_empty());
        assert!(options.last_event_id.is_none());
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get_json(build_router(state(RegistryConfig::default())), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["clients"], 0);
        assert_eq!(body["endpoints"]["stream"], "/stream");
    }

    #[tokio::test]
    async fn test_health_reports_producers() {
        let state = state(RegistryConfig::default());
        let (status, body) = get_json(build_router(Arc::clone(&state)), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connected_clients"], 0);
        assert_eq!(body["producers"]["event_producer"], "stopped");

        state.producers.start().await;
        let (_, body) = get_json(build_router(Arc::clone(&state)), "/health").await;
        assert_eq!(body["producers"]["event_producer"], "running");
        assert_eq!(body["producers"]["heartbeat_producer"], "running");
        state.producers.stop().await;
    }

    #[tokio::test]
    async fn test_clients_listing() {
        let state = state(RegistryConfig::default());
        let _client = state
            .manager
            .subscribe(ClientOptions::new().name("dashboard").topics(["alert"]))
            .await
            .unwrap();

        let (status, body) = get_json(build_router(Arc::clone(&state)), "/clients").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["client_count"], 1);
        assert_eq!(body["clients"][0]["name"], "dashboard");
        assert_eq!(body["clients"][0]["topics"][0], "alert");
        assert_eq!(body["clients"][0]["buffer_utilization"], 0.0);
        assert_eq!(body["history_capacity"], 1000);
    }

    #[tokio::test]
    async fn test_stream_returns_event_stream() {
        let state = state(RegistryConfig::default());
        let response = build_router(Arc::clone(&state))
            .oneshot(
                Request::get("/stream?topics=data&name=sse")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers()["x-accel-buffering"], "no");
        assert_eq!(state.manager.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_stream_rejected_at_client_limit() {
        let state = state(RegistryConfig::default().max_clients(1));
        let _held = state.manager.subscribe(ClientOptions::new()).await.unwrap();

        let (status, body) = get_json(build_router(Arc::clone(&state)), "/stream").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }
}
