//! Socket transport: HTTP/1.1 to tailscaled over its Unix domain socket.
//!
//! One connection per call, addressed to the pseudo-host
//! [`PSEUDO_HOST`](crate::endpoint::PSEUDO_HOST). The connection driver runs
//! inside the call's own future rather than a spawned task, so dropping the
//! call (on timeout) tears down the request, the connection and the socket
//! together.

use std::path::{Path, PathBuf};

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::{Reply, Transport};
use crate::BoxFuture;
use crate::endpoint::{Endpoint, PSEUDO_HOST};
use crate::error::LocalApiError;

/// Talks to the daemon over its LocalAPI Unix socket.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    socket_path: PathBuf,
}

impl SocketTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn send(&self, endpoint: &Endpoint) -> Result<Reply, LocalApiError> {
        let target = endpoint.request_target()?;
        let body = endpoint
            .body()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| LocalApiError::Request(format!("failed to serialize body: {e}")))?;

        let stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| LocalApiError::Connect {
                    path: self.socket_path.clone(),
                    source: e,
                })?;

        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(|e| LocalApiError::Request(format!("HTTP handshake failed: {e}")))?;

        let mut builder = hyper::Request::builder()
            .method(endpoint.method().clone())
            .uri(target)
            .header(HOST, PSEUDO_HOST);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| LocalApiError::Request(format!("failed to build request: {e}")))?;

        debug!(%endpoint, socket = %self.socket_path.display(), "LocalAPI socket request");

        let exchange = async move {
            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| LocalApiError::Request(format!("request failed: {e}")))?;
            let status = resp.status().as_u16();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| LocalApiError::Request(format!("failed to read response body: {e}")))?
                .to_bytes();
            Ok::<_, LocalApiError>(Reply::Http { status, body })
        };
        tokio::pin!(exchange);
        tokio::pin!(conn);

        tokio::select! {
            biased;
            reply = &mut exchange => reply,
            driven = &mut conn => {
                // The daemon may close right after the response; the body is
                // already buffered, so finish reading it.
                if let Err(e) = driven {
                    warn!(error = %e, "LocalAPI connection error");
                    return Err(LocalApiError::Request(format!("connection error: {e}")));
                }
                exchange.await
            }
        }
    }
}

impl Transport for SocketTransport {
    fn name(&self) -> &str {
        "socket"
    }

    fn execute<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<Reply, LocalApiError>> {
        Box::pin(self.send(endpoint))
    }
}
