#![deny(unsafe_code)]

//! Shared test utilities for the tslocal workspace.
//!
//! Stand-ins for the daemon on both transports, so client behavior can be
//! tested without a running tailscaled:
//!
//! - [`daemon::FakeDaemon`] serves canned LocalAPI replies over a temporary
//!   Unix socket and records every request.
//! - [`fake_cli`] builds CLI transports backed by small `sh` scripts.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! tslocal-test-utils = { workspace = true }
//! ```

pub mod daemon;
pub mod fake_cli;
pub mod tracing_setup;

pub use daemon::{CannedResponse, FakeDaemon, RecordedRequest};
