//! Error taxonomy for LocalAPI calls.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from a LocalAPI call, on either transport.
#[derive(Debug, thiserror::Error)]
pub enum LocalApiError {
    /// HTTP 403 from the daemon.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// HTTP 404 from the daemon.
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    /// HTTP 412 from the daemon.
    #[error("preconditions failed: {0}")]
    PreconditionsFailed(String),

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("cannot connect to the daemon (Unix socket: {path}): {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The CLI printed nothing but whitespace.
    #[error("empty response from CLI")]
    EmptyResponse,

    /// A required argument was missing; no request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to run {program}: {source}")]
    CliUnavailable {
        program: String,
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(String),

    /// The payload did not match the typed response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LocalApiError {
    /// Map a non-success HTTP status and its body text onto the taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        let or_default = |fallback: &str| {
            if body.is_empty() {
                fallback.to_string()
            } else {
                body.clone()
            }
        };
        match status {
            403 => Self::AccessDenied(or_default("Access denied")),
            404 => Self::PeerNotFound(or_default("Peer not found")),
            412 => Self::PreconditionsFailed(or_default("Preconditions failed")),
            _ => Self::Http { status, body },
        }
    }

    /// Whether the daemon could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::CliUnavailable { .. })
    }
}
