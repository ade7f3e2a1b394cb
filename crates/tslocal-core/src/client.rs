//! LocalAPI client with typed accessors over a [`Transport`].
//!
//! Every call goes through [`LocalApiClient::request`]: the endpoint is run on
//! the transport chosen at construction under the configured deadline, then
//! the reply is classified and normalized. Typed methods deserialize the
//! normalized payload.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use tslocal_config::ClientConfig;

use crate::endpoint::Endpoint;
use crate::error::LocalApiError;
use crate::response::decode_reply;
use crate::transport::{Transport, select_transport};
use crate::types::*;

/// Client for the daemon's LocalAPI.
///
/// Cheap to clone; clones share the configuration and transport.
#[derive(Clone)]
pub struct LocalApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for LocalApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalApiClient")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl LocalApiClient {
    /// Client for `config` on the current host OS.
    pub fn new(config: ClientConfig) -> Self {
        Self::for_platform(config, std::env::consts::OS)
    }

    /// Default configuration with the socket path taken from the environment.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    /// Client for `config` as if running on `os`.
    pub fn for_platform(config: ClientConfig, os: &str) -> Self {
        let transport = select_transport(&config, os);
        Self::with_transport(config, transport)
    }

    /// Client over an explicit transport. The config still supplies the
    /// timeout.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Execute `endpoint` and return the normalized payload.
    pub async fn request(&self, endpoint: &Endpoint) -> Result<Value, LocalApiError> {
        let timeout = self.config.timeout();
        debug!(transport = self.transport.name(), %endpoint, "LocalAPI call");

        let reply = tokio::time::timeout(timeout, self.transport.execute(endpoint))
            .await
            .map_err(|_| {
                debug!(%endpoint, ?timeout, "LocalAPI call timed out");
                LocalApiError::Timeout(timeout)
            })??;

        decode_reply(reply)
    }

    /// Execute `endpoint` and deserialize the payload into `T`.
    ///
    /// `null` members are dropped first so they take their field defaults.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, LocalApiError> {
        let value = self.request(endpoint).await?;
        serde_json::from_value(drop_nulls(value))
            .map_err(|e| LocalApiError::Parse(format!("{endpoint}: {e}")))
    }

    async fn request_unit(&self, endpoint: &Endpoint) -> Result<(), LocalApiError> {
        self.request(endpoint).await.map(drop)
    }

    async fn request_text(&self, endpoint: &Endpoint) -> Result<String, LocalApiError> {
        Ok(match self.request(endpoint).await? {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }

    // ── Status & identity ──────────────────────────────────────────────

    /// Daemon status, optionally including peers.
    pub async fn status(&self, peers: bool) -> Result<Status, LocalApiError> {
        let mut endpoint = Endpoint::get("status");
        if !peers {
            endpoint = endpoint.query("peers", "false");
        }
        self.request_as(&endpoint).await
    }

    pub async fn status_without_peers(&self) -> Result<Status, LocalApiError> {
        self.status(false).await
    }

    /// Look up the node and user behind a Tailscale IP or `ip:port`.
    pub async fn whois(&self, addr: &str) -> Result<Whois, LocalApiError> {
        let addr = required("whois address", addr)?;
        self.request_as(&Endpoint::get("whois").query("addr", addr)).await
    }

    // ── Preferences ────────────────────────────────────────────────────

    pub async fn prefs(&self) -> Result<Prefs, LocalApiError> {
        self.request_as(&Endpoint::get("prefs")).await
    }

    /// Apply a partial edit and return the resulting prefs.
    pub async fn edit_prefs(&self, edit: &PartialPrefs) -> Result<Prefs, LocalApiError> {
        self.request_as(&Endpoint::patch("prefs").json(edit.to_masked())).await
    }

    /// Ask the daemon whether `prefs` would be accepted.
    pub async fn check_prefs(&self, prefs: &Prefs) -> Result<CheckPrefsResponse, LocalApiError> {
        let body = serde_json::to_value(prefs)
            .map_err(|e| LocalApiError::Request(format!("failed to serialize prefs: {e}")))?;
        self.request_as(&Endpoint::post("check-prefs").json(body)).await
    }

    // ── Network diagnostics ────────────────────────────────────────────

    pub async fn derp_map(&self) -> Result<DerpMap, LocalApiError> {
        self.request_as(&Endpoint::get("derpmap")).await
    }

    /// Ping a peer. `size` pads disco pings; zero or `None` leaves it to the
    /// daemon.
    pub async fn ping(
        &self,
        ip: &str,
        kind: PingType,
        size: Option<usize>,
    ) -> Result<PingResult, LocalApiError> {
        let ip = required("ping IP", ip)?;
        let mut endpoint = Endpoint::post("ping")
            .query("ip", ip)
            .query("type", kind.as_str());
        if let Some(size) = size.filter(|&n| n > 0) {
            endpoint = endpoint.query("size", size.to_string());
        }
        self.request_as(&endpoint).await
    }

    /// Resolve `name` through the daemon's DNS forwarder. `record_type`
    /// defaults to `A`.
    pub async fn query_dns(
        &self,
        name: &str,
        record_type: Option<&str>,
    ) -> Result<DnsQueryResponse, LocalApiError> {
        let name = required("DNS name", name)?;
        let record_type = record_type.filter(|t| !t.is_empty()).unwrap_or("A");
        self.request_as(
            &Endpoint::get("dns-query")
                .query("name", name)
                .query("type", record_type),
        )
        .await
    }

    pub async fn dns_os_config(&self) -> Result<DnsOsConfig, LocalApiError> {
        self.request_as(&Endpoint::get("dns-osconfig")).await
    }

    pub async fn check_ip_forwarding(&self) -> Result<IpForwardingCheck, LocalApiError> {
        self.request_as(&Endpoint::get("check-ip-forwarding")).await
    }

    pub async fn check_so_mark_in_use(&self) -> Result<SoMarkCheck, LocalApiError> {
        self.request_as(&Endpoint::get("check-so-mark-in-use")).await
    }

    // ── Profiles ───────────────────────────────────────────────────────

    /// The active login profile, or `None` if it cannot be fetched for any
    /// reason.
    pub async fn current_profile(&self) -> Option<LoginProfile> {
        let endpoint = Endpoint::get("profiles/current");
        match self.request_as::<LoginProfile>(&endpoint).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                debug!(error = %e, "no current profile");
                None
            }
        }
    }

    pub async fn profiles(&self) -> Result<Vec<LoginProfile>, LocalApiError> {
        self.request_as(&Endpoint::get("profiles")).await
    }

    /// Current profile and the profile list, fetched concurrently.
    pub async fn profile_status(&self) -> Result<ProfileStatus, LocalApiError> {
        let (current, profiles) = tokio::join!(self.current_profile(), self.profiles());
        Ok(ProfileStatus {
            current,
            profiles: profiles?,
        })
    }

    pub async fn switch_profile(&self, id: &str) -> Result<(), LocalApiError> {
        let id = required("profile ID", id)?;
        self.request_unit(&Endpoint::post("profiles").segment(id)).await
    }

    /// Create and switch to a new, empty profile.
    pub async fn create_profile(&self) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::put("profiles")).await
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), LocalApiError> {
        let id = required("profile ID", id)?;
        self.request_unit(&Endpoint::delete("profiles").segment(id)).await
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    pub async fn login_interactive(&self) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::post("login-interactive")).await
    }

    pub async fn logout(&self) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::post("logout")).await
    }

    pub async fn reset_auth(&self) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::post("reset-auth")).await
    }

    /// Start the backend with the given options object.
    pub async fn start(&self, options: Value) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::post("start").json(options)).await
    }

    pub async fn shutdown(&self) -> Result<(), LocalApiError> {
        self.request_unit(&Endpoint::post("shutdown")).await
    }

    pub async fn reload_config(&self) -> Result<ReloadConfigResponse, LocalApiError> {
        self.request_as(&Endpoint::post("reload-config")).await
    }

    // ── Text endpoints ─────────────────────────────────────────────────

    /// Prometheus-format daemon metrics.
    pub async fn daemon_metrics(&self) -> Result<String, LocalApiError> {
        self.request_text(&Endpoint::get("metrics")).await
    }

    /// Prometheus-format user-facing metrics.
    pub async fn user_metrics(&self) -> Result<String, LocalApiError> {
        self.request_text(&Endpoint::get("usermetrics")).await
    }

    /// Goroutine dump of the daemon.
    pub async fn goroutines(&self) -> Result<String, LocalApiError> {
        self.request_text(&Endpoint::get("goroutines")).await
    }
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str, LocalApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LocalApiError::InvalidArgument(format!("{what} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::BoxFuture;
    use crate::transport::Reply;
    use hyper::Method;
    use hyper::body::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Returns the same reply to every call and records what it was asked.
    struct Recorder {
        reply: Reply,
        seen: Mutex<Vec<Endpoint>>,
    }

    impl Recorder {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn json(status: u16, body: Value) -> Arc<Self> {
            Self::new(Reply::Http {
                status,
                body: Bytes::from(body.to_string()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|ep| ep.to_string())
                .collect()
        }
    }

    impl Transport for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn execute<'a>(
            &'a self,
            endpoint: &'a Endpoint,
        ) -> BoxFuture<'a, Result<Reply, LocalApiError>> {
            self.seen.lock().unwrap().push(endpoint.clone());
            let reply = self.reply.clone();
            Box::pin(async move { Ok(reply) })
        }
    }

    /// Never answers.
    struct Stall;

    impl Transport for Stall {
        fn name(&self) -> &str {
            "stall"
        }

        fn execute<'a>(&'a self, _: &'a Endpoint) -> BoxFuture<'a, Result<Reply, LocalApiError>> {
            Box::pin(std::future::pending())
        }
    }

    fn client_over(transport: Arc<dyn Transport>) -> LocalApiClient {
        LocalApiClient::with_transport(ClientConfig::default(), transport)
    }

    #[test]
    fn test_platform_selection() {
        let config = ClientConfig::default().with_socket_path("/tmp/x.sock");
        assert_eq!(
            LocalApiClient::for_platform(config.clone(), "linux").transport_name(),
            "socket"
        );
        assert_eq!(
            LocalApiClient::for_platform(config, "windows").transport_name(),
            "cli"
        );
    }

    #[tokio::test]
    async fn test_status_paths() {
        let recorder = Recorder::json(200, json!({"BackendState": "Running"}));
        let client = client_over(recorder.clone());

        let status = client.status(true).await.unwrap();
        assert_eq!(status.backend_state, BackendState::Running);
        client.status_without_peers().await.unwrap();

        assert_eq!(
            recorder.seen(),
            vec!["GET v0/status", "GET v0/status?peers=false"]
        );
    }

    #[tokio::test]
    async fn test_empty_arguments_never_reach_transport() {
        let recorder = Recorder::json(200, json!({}));
        let client = client_over(recorder.clone());

        for result in [
            client.whois("").await.map(drop),
            client.whois("   ").await.map(drop),
            client.ping("", PingType::Disco, None).await.map(drop),
            client.query_dns("", None).await.map(drop),
            client.switch_profile("").await,
            client.delete_profile("").await,
        ] {
            assert!(matches!(result, Err(LocalApiError::InvalidArgument(_))));
        }
        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_ping_query() {
        let recorder = Recorder::json(200, json!({"IP": "100.64.0.2", "LatencySeconds": 0.5}));
        let client = client_over(recorder.clone());

        let result = client.ping("100.64.0.2", PingType::Tsmp, Some(64)).await.unwrap();
        assert_eq!(result.ip, "100.64.0.2");
        client.ping("100.64.0.2", PingType::default(), Some(0)).await.unwrap();
        client
            .ping("100.64.0.2", PingType::Other("taildrop".into()), None)
            .await
            .unwrap();

        assert_eq!(
            recorder.seen(),
            vec![
                "POST v0/ping?ip=100.64.0.2&type=TSMP&size=64",
                "POST v0/ping?ip=100.64.0.2&type=disco",
                "POST v0/ping?ip=100.64.0.2&type=taildrop",
            ]
        );
    }

    #[tokio::test]
    async fn test_query_dns_defaults_to_a() {
        let recorder = Recorder::json(200, json!({"Bytes": "", "Resolvers": []}));
        let client = client_over(recorder.clone());

        client.query_dns("example.com", None).await.unwrap();
        client.query_dns("example.com", Some("AAAA")).await.unwrap();

        assert_eq!(
            recorder.seen(),
            vec![
                "GET v0/dns-query?name=example.com&type=A",
                "GET v0/dns-query?name=example.com&type=AAAA",
            ]
        );
    }

    #[tokio::test]
    async fn test_edit_prefs_sends_masked_body() {
        let recorder = Recorder::json(200, json!({"Hostname": "box", "ShieldsUp": true}));
        let client = client_over(recorder.clone());

        let prefs = client
            .edit_prefs(&PartialPrefs {
                shields_up: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(prefs.shields_up);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method(), &Method::PATCH);
        assert_eq!(
            seen[0].body(),
            Some(&json!({"ShieldsUp": true, "ShieldsUpSet": true}))
        );
    }

    #[tokio::test]
    async fn test_profile_mutations() {
        let recorder = Recorder::new(Reply::Http {
            status: 204,
            body: Bytes::new(),
        });
        let client = client_over(recorder.clone());

        client.switch_profile("a1b2").await.unwrap();
        client.create_profile().await.unwrap();
        client.delete_profile("a1b2").await.unwrap();
        client.logout().await.unwrap();

        assert_eq!(
            recorder.seen(),
            vec![
                "POST v0/profiles/a1b2",
                "PUT v0/profiles",
                "DELETE v0/profiles/a1b2",
                "POST v0/logout",
            ]
        );
    }

    #[tokio::test]
    async fn test_current_profile_swallows_errors() {
        let client = client_over(Recorder::new(Reply::Http {
            status: 404,
            body: Bytes::from_static(b"no profile"),
        }));
        assert_eq!(client.current_profile().await, None);

        let client = client_over(Recorder::new(Reply::Output("\n".to_string())));
        assert_eq!(client.current_profile().await, None);
    }

    #[tokio::test]
    async fn test_profile_status_propagates_list_error() {
        let client = client_over(Recorder::new(Reply::Http {
            status: 403,
            body: Bytes::new(),
        }));
        assert!(matches!(
            client.profile_status().await,
            Err(LocalApiError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_text_endpoints() {
        let metrics = "# TYPE tailscaled_health_messages gauge\n";
        let client = client_over(Recorder::new(Reply::Output(metrics.to_string())));
        assert_eq!(client.daemon_metrics().await.unwrap(), metrics);
        assert_eq!(client.goroutines().await.unwrap(), metrics);
    }

    #[tokio::test]
    async fn test_typed_mismatch_is_parse_error() {
        let client = client_over(Recorder::new(Reply::Output("not json".to_string())));
        assert!(matches!(
            client.status(true).await,
            Err(LocalApiError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(20));
        let client = LocalApiClient::with_transport(config, Arc::new(Stall));
        assert!(matches!(
            client.request(&Endpoint::get("status")).await,
            Err(LocalApiError::Timeout(d)) if d == Duration::from_millis(20)
        ));
    }

    #[test]
    fn test_debug_names_transport() {
        let client = client_over(Arc::new(Stall));
        assert!(format!("{client:?}").contains("stall"));
    }
}
