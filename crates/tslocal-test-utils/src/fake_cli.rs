//! Fake daemon CLIs built from `sh -c` scripts.
//!
//! Each helper returns a [`CliTransport`] whose program is `sh`. The script
//! text and its `$0` are passed as base arguments, so the
//! `debug localapi <METHOD> <path> [body]` arguments the transport appends
//! arrive as `$1`, `$2`, and so on.

use std::sync::Arc;
use std::time::Duration;

use tslocal_config::{ClientConfig, TransportPreference};
use tslocal_core::{CliTransport, LocalApiClient};

fn script(body: &str, arg0: &str) -> CliTransport {
    CliTransport::new("sh").with_base_args(["-c", body, arg0])
}

/// Prints `output` verbatim and exits 0, whatever it is asked.
pub fn printing(output: &str) -> CliTransport {
    script(r#"printf '%s' "$0""#, output)
}

/// Prints `output` and exits with `code`.
pub fn printing_with_exit(output: &str, code: i32) -> CliTransport {
    script(&format!(r#"printf '%s' "$0"; exit {code}"#), output)
}

/// Prints each received argument on its own line.
pub fn echoing_args() -> CliTransport {
    script(r#"printf '%s\n' "$@""#, "fake-tailscale")
}

/// Sleeps for `duration` before printing `{}`.
pub fn sleeping(duration: Duration) -> CliTransport {
    script(
        &format!("sleep {}; printf '{{}}'", duration.as_secs_f64()),
        "fake-tailscale",
    )
}

/// Client forced onto `transport` with the given timeout.
pub fn client(transport: CliTransport, timeout: Duration) -> LocalApiClient {
    let config = ClientConfig::default()
        .with_transport(TransportPreference::Cli)
        .with_cli_path(transport.program().to_string())
        .with_timeout(timeout);
    LocalApiClient::with_transport(config, Arc::new(transport))
}
