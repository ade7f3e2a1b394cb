//! CLI transport, running `tailscale debug localapi <METHOD> <path> [body]`.
//!
//! Used where the daemon's socket is not reachable from other processes
//! (macOS app-store builds, Windows). Only stdout is captured; stderr goes to
//! the null device. The child is killed if the call is dropped.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{Reply, Transport};
use crate::BoxFuture;
use crate::endpoint::Endpoint;
use crate::error::LocalApiError;

/// Shells out to the daemon's own CLI, one child process per call.
#[derive(Debug, Clone)]
pub struct CliTransport {
    program: String,
    base_args: Vec<String>,
}

impl CliTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Arguments placed before `debug localapi ...`, e.g. to run the CLI
    /// through a wrapper.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for `endpoint`.
    pub fn args_for(&self, endpoint: &Endpoint) -> Result<Vec<String>, LocalApiError> {
        let mut args = self.base_args.clone();
        args.extend([
            "debug".to_string(),
            "localapi".to_string(),
            endpoint.method().to_string(),
            endpoint.versioned_path()?,
        ]);
        if let Some(body) = endpoint.body() {
            let json = serde_json::to_string(body)
                .map_err(|e| LocalApiError::Request(format!("failed to serialize body: {e}")))?;
            args.push(json);
        }
        Ok(args)
    }

    async fn run(&self, endpoint: &Endpoint) -> Result<Reply, LocalApiError> {
        let args = self.args_for(endpoint)?;
        debug!(%endpoint, program = %self.program, "LocalAPI CLI request");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LocalApiError::CliUnavailable {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            debug!(status = %output.status, %endpoint, "LocalAPI CLI exited unsuccessfully");
        }

        Ok(Reply::Output(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

impl Transport for CliTransport {
    fn name(&self) -> &str {
        "cli"
    }

    fn execute<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<Reply, LocalApiError>> {
        Box::pin(self.run(endpoint))
    }
}
