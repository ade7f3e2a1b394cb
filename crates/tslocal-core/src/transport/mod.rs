//! How a LocalAPI call reaches the daemon.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   execute(Endpoint)   ┌───────────────┐
//! │ LocalApiClient │──────────────────────▶│   Transport   │  (trait)
//! └────────────────┘◀──────────────────────└───────┬───────┘
//!                          Reply                   │
//!                                     ┌────────────┴────────────┐
//!                                     ▼                         ▼
//!                          ┌────────────────────┐    ┌────────────────────┐
//!                          │  SocketTransport   │    │    CliTransport    │
//!                          │ HTTP/1.1 over Unix │    │ tailscale debug    │
//!                          │ socket (Linux, BSD)│    │ localapi (mac, win)│
//!                          └────────────────────┘    └────────────────────┘
//! ```
//!
//! Transports only move bytes; classification and normalization happen in
//! the client so both paths share them.

pub mod cli;
pub mod socket;

use std::sync::Arc;

use hyper::body::Bytes;
use tslocal_config::{ClientConfig, TransportPreference};

use crate::BoxFuture;
use crate::endpoint::Endpoint;
use crate::error::LocalApiError;

pub use cli::CliTransport;
pub use socket::SocketTransport;

/// Raw outcome of a call, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status and body from the socket transport.
    Http { status: u16, body: Bytes },
    /// Captured standard output from the CLI transport.
    Output(String),
}

/// A way of executing LocalAPI calls.
///
/// Implementations must be `Send + Sync`; the client shares one transport
/// across concurrent calls. Dropping the returned future must abandon the
/// call and release whatever it holds (connection, child process).
pub trait Transport: Send + Sync {
    /// Transport display name, used in logs.
    fn name(&self) -> &str;

    /// Execute one call.
    fn execute<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Reply, LocalApiError>>;
}

/// The two built-in transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Socket,
    Cli,
}

impl TransportKind {
    /// Resolve a preference on the given OS (`std::env::consts::OS` values).
    ///
    /// The daemon's socket is not reachable on macOS and Windows, so `auto`
    /// falls back to the CLI there.
    pub fn resolve(preference: TransportPreference, os: &str) -> Self {
        match preference {
            TransportPreference::Socket => Self::Socket,
            TransportPreference::Cli => Self::Cli,
            TransportPreference::Auto => match os {
                "windows" | "macos" => Self::Cli,
                _ => Self::Socket,
            },
        }
    }
}

/// Build the transport for `config` on `os`.
pub fn select_transport(config: &ClientConfig, os: &str) -> Arc<dyn Transport> {
    match TransportKind::resolve(config.transport, os) {
        TransportKind::Socket => Arc::new(SocketTransport::new(config.resolved_socket_path())),
        TransportKind::Cli => Arc::new(CliTransport::new(config.cli_path.clone())),
    }
}
