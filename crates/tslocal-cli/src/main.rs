#![deny(unsafe_code)]

//! tslocal: poke at the tailscaled LocalAPI from the command line.

mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tslocal_config::{AppConfig, ClientConfig, TransportPreference};
use tslocal_core::types::PingType;
use tslocal_core::{Endpoint, LocalApiClient, Method};

/// Query the Tailscale daemon's LocalAPI.
#[derive(Parser)]
#[command(name = "tslocal", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LocalAPI socket path (overrides config and environment).
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Per-call timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Transport: auto, socket or cli.
    #[arg(long)]
    transport: Option<TransportPreference>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a health report (the default).
    Report,

    /// Show daemon status.
    Status {
        /// Leave out peers.
        #[arg(long)]
        no_peers: bool,
    },

    /// Identify the node and user behind an IP or ip:port.
    Whois { addr: String },

    /// Show current preferences.
    Prefs,

    /// Show the DERP relay map.
    DerpMap,

    /// Ping a peer.
    Ping {
        ip: String,
        /// disco, TSMP, ICMP or peerapi.
        #[arg(long = "type", default_value = "disco")]
        kind: PingType,
        /// Padded packet size.
        #[arg(long)]
        size: Option<usize>,
    },

    /// Resolve a name through the daemon's DNS forwarder.
    Dns {
        name: String,
        /// Record type.
        #[arg(long = "type", default_value = "A")]
        record_type: String,
    },

    /// Show the current profile and all profiles.
    Profiles,

    /// Print Prometheus metrics.
    Metrics {
        /// User-facing metrics instead of daemon metrics.
        #[arg(long)]
        user: bool,
    },

    /// Send an arbitrary LocalAPI request.
    Raw {
        method: String,
        /// Path under v0/, e.g. `status?peers=false`.
        path: String,
        /// JSON body.
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = match cli.config.as_deref() {
        Some(path) => load_config(path).await?,
        None => AppConfig::default(),
    };

    let filter = match cli.verbose {
        0 => app_config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.config.is_none() {
        info!("No config file given, using defaults");
    }

    let config = client_config(&cli, app_config.client)?;
    let client = LocalApiClient::new(config);
    debug!(transport = client.transport_name(), "client ready");

    match cli.command.unwrap_or(Commands::Report) {
        Commands::Report => {
            let passed = report::run(&client, &mut std::io::stdout().lock()).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Status { no_peers } => print_json(&client.status(!no_peers).await?)?,
        Commands::Whois { addr } => print_json(&client.whois(&addr).await?)?,
        Commands::Prefs => print_json(&client.prefs().await?)?,
        Commands::DerpMap => print_json(&client.derp_map().await?)?,
        Commands::Ping { ip, kind, size } => print_json(&client.ping(&ip, kind, size).await?)?,
        Commands::Dns { name, record_type } => {
            print_json(&client.query_dns(&name, Some(&record_type)).await?)?
        }
        Commands::Profiles => print_json(&client.profile_status().await?)?,
        Commands::Metrics { user } => {
            let text = if user {
                client.user_metrics().await?
            } else {
                client.daemon_metrics().await?
            };
            print!("{text}");
        }
        Commands::Raw { method, path, body } => {
            let endpoint = raw_endpoint(&method, &path, body.as_deref())?;
            match client.request(&endpoint).await? {
                Value::String(text) => print!("{text}"),
                value => print_json(&value)?,
            }
        }
    }

    Ok(())
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path)
        .await
        .with_context(|| format!("loading {}", path.display()))
}

/// Command-line flags over the file, then the environment for an unset socket.
fn client_config(cli: &Cli, file: ClientConfig) -> Result<ClientConfig> {
    let mut config = file;
    if let Some(socket) = &cli.socket {
        config = config.with_socket_path(socket);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    if let Some(transport) = cli.transport {
        config = config.with_transport(transport);
    }
    let config = config.with_env_lookup(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn raw_endpoint(method: &str, path: &str, body: Option<&str>) -> Result<Endpoint> {
    let method = method
        .to_ascii_uppercase()
        .parse::<Method>()
        .with_context(|| format!("invalid method {method:?}"))?;
    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    let mut endpoint = Endpoint::new(method, path.trim_start_matches("v0/"));
    // Decode here; the endpoint escapes again when it builds the target.
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        endpoint = endpoint.query(key, value);
    }
    if let Some(body) = body {
        let json: Value = serde_json::from_str(body).context("body is not valid JSON")?;
        endpoint = endpoint.json(json);
    }
    Ok(endpoint)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
