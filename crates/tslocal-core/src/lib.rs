#![deny(unsafe_code)]

//! Typed client for the tailscaled LocalAPI.
//!
//! Calls reach the daemon either as HTTP/1.1 over its Unix socket or, where
//! that socket is not reachable (macOS, Windows), by running
//! `tailscale debug localapi`. Both paths share error classification and
//! response key normalization, so callers see one contract.
//!
//! ```no_run
//! # async fn demo() -> Result<(), tslocal_core::LocalApiError> {
//! let client = tslocal_core::LocalApiClient::from_env();
//! let status = client.status_without_peers().await?;
//! println!("{:?}", status.backend_state);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, returned by trait methods that
/// must stay object-safe (`dyn Transport`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The client and its typed accessors.
pub mod client;
/// Endpoint descriptors and URL construction.
pub mod endpoint;
pub mod error;
/// Key-casing normalization for response payloads.
pub mod normalize;
/// Reply classification.
pub mod response;
/// Socket and CLI transports.
pub mod transport;
/// Typed response structures.
pub mod types;

pub use client::LocalApiClient;
pub use endpoint::Endpoint;
pub use error::LocalApiError;
pub use hyper::Method;
pub use normalize::{normalize_key, normalize_keys};
pub use transport::{CliTransport, Reply, SocketTransport, Transport, TransportKind};
pub use tslocal_config::{ClientConfig, TransportPreference};
