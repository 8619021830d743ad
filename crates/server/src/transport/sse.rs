use crate::config::ServerConfig;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use jellyseerr_mcp::McpServer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Live sessions, keyed by id. Each entry feeds that session's worker.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<Value>>>>,
}

impl SessionRegistry {
    fn insert(&self, id: Uuid, sender: mpsc::UnboundedSender<Value>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
    }

    fn get(&self, id: &Uuid) -> Option<mpsc::UnboundedSender<Value>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Removes the session when its event stream is dropped.
struct SessionGuard {
    id: Uuid,
    sessions: SessionRegistry,
}

impl SessionGuard {
    /// Stop accepting messages. The worker exits once its queue is empty.
    fn stop_accepting(&self) {
        self.sessions.remove(&self.id);
        tracing::info!(session = %self.id.simple(), "Draining SSE session");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        tracing::info!(
            session = %self.id.simple(),
            open_sessions = self.sessions.len(),
            "SSE session closed"
        );
    }
}

#[derive(Clone)]
struct SseState {
    server: Arc<McpServer>,
    sessions: SessionRegistry,
    messages_path: String,
    shutdown: CancellationToken,
}

/// `GET <mount>/sse` opens a session; `POST <mount>/messages/?session_id=` feeds it.
pub fn routes(config: &ServerConfig, server: Arc<McpServer>, shutdown: CancellationToken) -> Router {
    routes_with_sessions(config, server, shutdown, SessionRegistry::default())
}

fn routes_with_sessions(
    config: &ServerConfig,
    server: Arc<McpServer>,
    shutdown: CancellationToken,
    sessions: SessionRegistry,
) -> Router {
    let messages_path = config.mounted("messages/");
    let state = SseState {
        server,
        sessions,
        messages_path: messages_path.clone(),
        shutdown,
    };

    Router::new()
        .route(&config.mounted("sse"), get(open_stream))
        .route(&messages_path, post(post_message))
        .route(messages_path.trim_end_matches('/'), post(post_message))
        .with_state(state)
}

async fn open_stream(State(state): State<SseState>) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response();
    }

    let session_id = Uuid::new_v4();
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Value>();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    state.sessions.insert(session_id, inbound_tx);
    tracing::info!(session = %session_id.simple(), "SSE session opened");

    // Messages of one session are handled in arrival order.
    let server = state.server.clone();
    tokio::spawn(async move {
        while let Some(message) = inbound_rx.recv().await {
            if let Some(response) = server.handle_value(message).await {
                if outbound_tx.send(response).is_err() {
                    break;
                }
            }
        }
    });

    let endpoint = format!("{}?session_id={}", state.messages_path, session_id.simple());
    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };
    let shutdown = state.shutdown.clone();

    // On shutdown the stream keeps going until every queued and in-flight
    // response has been delivered, then ends when the worker drops its sender.
    let stream = async_stream::stream! {
        let guard = guard;
        let mut draining = false;
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));

        loop {
            let next = if draining {
                outbound_rx.recv().await
            } else {
                tokio::select! {
                    biased;
                    response = outbound_rx.recv() => response,
                    _ = shutdown.cancelled() => {
                        guard.stop_accepting();
                        draining = true;
                        continue;
                    }
                }
            };
            let Some(response) = next else {
                break;
            };

            match serde_json::to_string(&response) {
                Ok(payload) => yield Ok(Event::default().event("message").data(payload)),
                Err(err) => tracing::error!(error = %err, "Failed to encode response"),
            }
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let Some(raw) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Ok(session_id) = Uuid::parse_str(&raw) else {
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };
    let Some(sender) = state.sessions.get(&session_id) else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(session = %session_id.simple(), error = %err, "Unparsable message body");
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    if sender.send(message).is_err() {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing;
    use axum::body::{Body, BodyDataStream};
    use axum::http::Request;
    use futures::StreamExt;
    use jellyseerr_client::{ClientResult, HttpMethod, QueryParams, UpstreamApi};
    use tower::ServiceExt;

    /// Upstream that answers after a fixed delay.
    struct SlowUpstream(Duration);

    #[async_trait::async_trait]
    impl UpstreamApi for SlowUpstream {
        async fn request(
            &self,
            _method: HttpMethod,
            path: &str,
            _params: Option<&QueryParams>,
            _body: Option<&Value>,
        ) -> ClientResult<Value> {
            tokio::time::sleep(self.0).await;
            Ok(serde_json::json!({ "path": path }))
        }
    }

    struct EventReader {
        stream: BodyDataStream,
        buffer: String,
    }

    impl EventReader {
        /// Next `(event, data)` pair, skipping keep-alive comments.
        async fn next(&mut self) -> Option<(String, String)> {
            loop {
                if let Some(end) = self.buffer.find("\n\n") {
                    let frame: String = self.buffer.drain(..end + 2).collect();
                    let mut event = String::new();
                    let mut data = String::new();
                    for line in frame.lines() {
                        if let Some(value) = line.strip_prefix("event:") {
                            event = value.trim().to_string();
                        } else if let Some(value) = line.strip_prefix("data:") {
                            data.push_str(value.trim());
                        }
                    }
                    if event.is_empty() && data.is_empty() {
                        continue;
                    }
                    return Some((event, data));
                }

                let chunk = self.stream.next().await?.ok()?;
                self.buffer.push_str(std::str::from_utf8(&chunk).ok()?);
            }
        }
    }

    async fn open(app: &Router, path: &str) -> (EventReader, String) {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut reader = EventReader {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        };
        let (event, endpoint) = reader.next().await.unwrap();
        assert_eq!(event, "endpoint");
        (reader, endpoint)
    }

    async fn post(app: &Router, path: &str, body: &str) -> StatusCode {
        app.clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let sessions = SessionRegistry::default();
        let app = routes_with_sessions(
            &testing::config("/"),
            testing::server(),
            CancellationToken::new(),
            sessions.clone(),
        );

        let (mut reader, endpoint) = open(&app, "/sse").await;
        assert!(endpoint.starts_with("/messages/?session_id="));
        assert_eq!(sessions.len(), 1);

        let status = post(
            &app,
            &endpoint,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ping","arguments":{}}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let status = post(&app, &endpoint, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let status = post(&app, &endpoint, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (event, data) = reader.next().await.unwrap();
        assert_eq!(event, "message");
        let first: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(
            first["result"]["structuredContent"],
            serde_json::json!({"ok": true, "service": "jellyseerr-mcp"})
        );

        let (_, data) = reader.next().await.unwrap();
        let second: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(second["id"], 2);
        assert_eq!(second["result"]["tools"].as_array().unwrap().len(), 5);

        drop(reader);
        assert_eq!(sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_mount_path_prefixes_endpoints() {
        let app = routes(&testing::config("/jellyseerr"), testing::server(), CancellationToken::new());

        let (_reader, endpoint) = open(&app, "/jellyseerr/sse").await;
        assert!(endpoint.starts_with("/jellyseerr/messages/?session_id="));

        let status = post(&app, &endpoint, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_message_errors() {
        let app = routes(&testing::config("/"), testing::server(), CancellationToken::new());
        let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;

        assert_eq!(post(&app, "/messages/", ping).await, StatusCode::BAD_REQUEST);
        assert_eq!(
            post(&app, "/messages/?session_id=not-a-uuid", ping).await,
            StatusCode::BAD_REQUEST
        );
        let unknown = format!("/messages/?session_id={}", Uuid::new_v4().simple());
        assert_eq!(post(&app, &unknown, ping).await, StatusCode::NOT_FOUND);

        let (_reader, endpoint) = open(&app, "/sse").await;
        assert_eq!(post(&app, &endpoint, "{oops").await, StatusCode::BAD_REQUEST);

        let without_slash = endpoint.replacen("/messages/", "/messages", 1);
        assert_eq!(post(&app, &without_slash, ping).await, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let shutdown = CancellationToken::new();
        let sessions = SessionRegistry::default();
        let app = routes_with_sessions(
            &testing::config("/"),
            testing::server(),
            shutdown.clone(),
            sessions.clone(),
        );

        let (mut reader, _endpoint) = open(&app, "/sse").await;
        shutdown.cancel();

        assert!(reader.next().await.is_none());
        assert_eq!(sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_delivers_in_flight_response() {
        let shutdown = CancellationToken::new();
        let sessions = SessionRegistry::default();
        let server = Arc::new(McpServer::for_upstream(Arc::new(SlowUpstream(
            Duration::from_millis(200),
        ))));
        let app = routes_with_sessions(&testing::config("/"), server, shutdown.clone(), sessions.clone());

        let (mut reader, endpoint) = open(&app, "/sse").await;
        let status = post(
            &app,
            &endpoint,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_request","arguments":{"request_id":7}}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let (event, data) = reader.next().await.unwrap();
        assert_eq!(event, "message");
        let response: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["structuredContent"]["path"], "request/7");

        // Draining sessions take no new messages.
        let status = post(&app, &endpoint, r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(reader.next().await.is_none());
        assert_eq!(sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_delivers_queued_responses_in_order() {
        let shutdown = CancellationToken::new();
        let app = routes(&testing::config("/"), testing::server(), shutdown.clone());

        let (mut reader, endpoint) = open(&app, "/sse").await;
        for id in 1..=3 {
            let body = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"ping"}}"#);
            assert_eq!(post(&app, &endpoint, &body).await, StatusCode::ACCEPTED);
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();

        for id in 1..=3 {
            let (_, data) = reader.next().await.unwrap();
            let response: Value = serde_json::from_str(&data).unwrap();
            assert_eq!(response["id"], id);
        }
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_no_new_sessions_after_shutdown() {
        let shutdown = CancellationToken::new();
        let sessions = SessionRegistry::default();
        let app = routes_with_sessions(
            &testing::config("/"),
            testing::server(),
            shutdown.clone(),
            sessions.clone(),
        );
        shutdown.cancel();

        let response = app
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(sessions.len(), 0);
    }
}
