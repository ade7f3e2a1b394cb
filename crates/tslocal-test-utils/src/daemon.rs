//! Fake LocalAPI daemon: axum on a temporary Unix socket.
//!
//! Routes are registered per method and path relative to `/localapi/v0/`.
//! A registration with a query string matches only that exact query; one
//! without matches the path under any query. Unregistered calls get a 404.
//! Handlers dropped before answering (the client hung up mid-delay) are
//! recorded as cancelled.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, HOST, HeaderName};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::debug;

use tslocal_config::{ClientConfig, TransportPreference};
use tslocal_core::LocalApiClient;

const PREFIX: &str = "/localapi/v0/";

/// A reply the fake daemon sends for one route.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
    /// Wait this long before answering.
    pub delay: Option<Duration>,
}

impl CannedResponse {
    /// 200 with a JSON body.
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
            content_type: "application/json",
            delay: None,
        }
    }

    /// 200 with a plain text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/plain; charset=utf-8",
            delay: None,
        }
    }

    /// Arbitrary status with a plain text body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::text(body)
        }
    }

    pub fn no_content() -> Self {
        Self::status(204, "")
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// One request as the fake daemon saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, e.g. `/localapi/v0/status?peers=false`.
    pub target: String,
    pub host: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct FakeState {
    routes: Mutex<HashMap<(Method, String), CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cancelled: Mutex<Vec<String>>,
}

/// Records its target as cancelled unless disarmed before drop.
struct InFlight {
    state: Arc<FakeState>,
    target: Option<String>,
}

impl InFlight {
    fn finish(mut self) {
        self.target = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            debug!(%target, "fake daemon handler cancelled");
            if let Ok(mut cancelled) = self.state.cancelled.lock() {
                cancelled.push(target);
            }
        }
    }
}

/// A LocalAPI stand-in listening on a Unix socket in its own temp directory.
///
/// The server task is aborted and the directory removed on drop.
pub struct FakeDaemon {
    socket_path: PathBuf,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl FakeDaemon {
    /// Bind and start serving.
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("tailscaled.sock");
        let listener = UnixListener::bind(&socket_path).expect("failed to bind fake daemon socket");

        let state = Arc::new(FakeState::default());
        let app = axum::Router::new()
            .fallback(handle_any)
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "fake daemon stopped");
            }
        });

        Self {
            socket_path,
            state,
            handle,
            _temp_dir: temp_dir,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Register `response` for `method` on `path` (relative to
    /// `/localapi/v0/`, optionally with a query string).
    pub fn respond(&self, method: Method, path: &str, response: CannedResponse) -> &Self {
        let target = format!("{PREFIX}{}", path.trim_start_matches('/'));
        self.state
            .routes
            .lock()
            .expect("routes lock poisoned")
            .insert((method, target), response);
        self
    }

    /// Shorthand for a 200 JSON reply to `GET path`.
    pub fn respond_json(&self, path: &str, value: Value) -> &Self {
        self.respond(Method::GET, path, CannedResponse::json(value))
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }

    /// Targets whose handler was dropped before it answered.
    pub fn cancelled(&self) -> Vec<String> {
        self.state
            .cancelled
            .lock()
            .expect("cancelled lock poisoned")
            .clone()
    }

    /// Client configuration pinned to this daemon's socket.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_socket_path(&self.socket_path)
            .with_transport(TransportPreference::Socket)
            .with_timeout(Duration::from_secs(5))
    }

    pub fn client(&self) -> LocalApiClient {
        LocalApiClient::new(self.config())
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_any(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    debug!(%method, %target, "fake daemon request");
    state
        .requests
        .lock()
        .expect("requests lock poisoned")
        .push(RecordedRequest {
            method: method.to_string(),
            target: target.clone(),
            host: header(HOST),
            content_type: header(CONTENT_TYPE),
            body,
        });

    let canned = {
        let routes = state.routes.lock().expect("routes lock poisoned");
        routes
            .get(&(method.clone(), target.clone()))
            .or_else(|| routes.get(&(method.clone(), uri.path().to_string())))
            .cloned()
    };

    let Some(canned) = canned else {
        return (
            StatusCode::NOT_FOUND,
            format!("no fake route for {method} {target}"),
        )
            .into_response();
    };

    let in_flight = InFlight {
        state: state.clone(),
        target: Some(target),
    };
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    in_flight.finish();

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, canned.content_type)
        .body(Body::from(canned.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
