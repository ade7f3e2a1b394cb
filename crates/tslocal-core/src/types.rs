//! Typed LocalAPI responses.
//!
//! Field names follow the normalized (lower camel) wire form. Every field
//! is defaulted and unknown fields are ignored, since the daemon's schemas
//! are versioned independently of this crate. The daemon writes empty Go
//! slices and maps as `null`; [`drop_nulls`] turns those into missing
//! fields before deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Remove every object member whose value is `null`, at any depth.
///
/// A removed member falls back to its field default, so `"Peer": null`
/// reads as an empty map and `"AdvertiseTags": null` as an empty list.
pub fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(drop_nulls).collect()),
        other => other,
    }
}

/// Daemon backend state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendState {
    #[default]
    NoState,
    NeedsLogin,
    NeedsMachineAuth,
    Stopped,
    Starting,
    Running,
    #[serde(other)]
    Unknown,
}

/// Result of `GET status`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    pub version: String,
    pub tun: bool,
    pub backend_state: BackendState,
    pub have_node_key: bool,
    pub auth_url: String,
    pub tailscale_ips: Vec<String>,
    #[serde(rename = "self")]
    pub self_status: Option<PeerStatus>,
    pub health: Vec<String>,
    pub magic_dns_suffix: String,
    pub current_tailnet: Option<TailnetStatus>,
    pub cert_domains: Vec<String>,
    /// Peers keyed by node public key.
    pub peer: BTreeMap<String, PeerStatus>,
    /// Users keyed by user ID.
    pub user: BTreeMap<String, UserProfile>,
    pub client_version: Option<Value>,
}

impl Status {
    /// This node followed by its peers; the flag marks this node.
    pub fn devices(&self) -> impl Iterator<Item = (&PeerStatus, bool)> {
        self.self_status
            .iter()
            .map(|s| (s, true))
            .chain(self.peer.values().map(|p| (p, false)))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerStatus {
    pub id: String,
    pub public_key: String,
    pub host_name: String,
    #[serde(rename = "dnsName")]
    pub dns_name: String,
    pub os: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub tailscale_ips: Vec<String>,
    pub allowed_ips: Vec<String>,
    pub tags: Vec<String>,
    pub primary_routes: Vec<String>,
    pub addrs: Vec<String>,
    pub cur_addr: String,
    pub relay: String,
    pub peer_relay: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub created: String,
    pub last_write: String,
    pub last_seen: String,
    pub last_handshake: String,
    pub online: bool,
    pub exit_node: bool,
    pub exit_node_option: bool,
    pub active: bool,
    #[serde(rename = "peerApiurl")]
    pub peer_api_url: Vec<String>,
    pub capabilities: Vec<String>,
    pub ssh_host_keys: Vec<String>,
    pub sharee_node: bool,
    pub in_network_map: bool,
    pub in_magic_sock: bool,
    pub in_engine: bool,
    pub expired: bool,
    pub key_expiry: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TailnetStatus {
    pub name: String,
    pub magic_dns_suffix: String,
    pub magic_dns_enabled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: i64,
    pub login_name: String,
    pub display_name: String,
    pub profile_pic_url: String,
}

/// Result of `GET whois`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Whois {
    pub node: Option<Node>,
    pub user_profile: Option<UserProfile>,
    /// Capability grants keyed by capability URL.
    pub cap_map: Option<Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    pub id: i64,
    pub stable_id: String,
    pub name: String,
    pub user: i64,
    pub sharer: Option<i64>,
    pub key: String,
    pub key_expiry: String,
    pub machine: String,
    pub disco_key: String,
    pub addresses: Vec<String>,
    pub allowed_ips: Vec<String>,
    pub endpoints: Vec<String>,
    pub derp: Option<String>,
    pub home_derp: Option<i64>,
    pub hostinfo: Hostinfo,
    pub created: String,
    pub tags: Vec<String>,
    pub primary_routes: Vec<String>,
    pub last_seen: Option<String>,
    pub online: Option<bool>,
    pub machine_authorized: bool,
    pub capabilities: Vec<String>,
    pub computed_name: String,
    pub computed_name_with_host: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hostinfo {
    pub ipn_version: String,
    pub os: String,
    pub os_version: String,
    pub hostname: String,
    pub services: Vec<Service>,
    pub ssh_host_keys: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    /// `tcp`, `udp`, `peerapi4`, `peerapi6` or `peerapi-dns-proxy`.
    pub proto: String,
    pub port: u16,
    pub description: String,
}

/// Result of `GET prefs`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prefs {
    pub control_url: String,
    pub route_all: bool,
    pub exit_node_id: String,
    pub exit_node_ip: String,
    pub exit_node_allow_lan_access: bool,
    pub corp_dns: bool,
    pub run_ssh: bool,
    pub run_web_client: bool,
    pub want_running: bool,
    pub logged_out: bool,
    pub shields_up: bool,
    pub advertise_tags: Vec<String>,
    pub hostname: String,
    pub advertise_routes: Vec<String>,
    pub no_snat: bool,
    pub operator_user: String,
    pub profile_name: String,
}

/// A prefs edit for `PATCH prefs`; unset fields are left alone.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PartialPrefs {
    pub hostname: Option<String>,
    pub route_all: Option<bool>,
    pub exit_node_id: Option<String>,
    pub exit_node_allow_lan_access: Option<bool>,
    pub corp_dns: Option<bool>,
    pub run_ssh: Option<bool>,
    pub want_running: Option<bool>,
    pub shields_up: Option<bool>,
    pub advertise_tags: Option<Vec<String>>,
    pub advertise_routes: Option<Vec<String>>,
}

impl PartialPrefs {
    /// The daemon's masked-prefs body: each set field under its native name
    /// plus a `<Name>Set: true` marker.
    pub fn to_masked(&self) -> Value {
        let mut map = Map::new();
        let mut put = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(name.to_string(), value);
                map.insert(format!("{name}Set"), Value::Bool(true));
            }
        };
        put("Hostname", self.hostname.clone().map(Value::String));
        put("RouteAll", self.route_all.map(Value::Bool));
        put("ExitNodeID", self.exit_node_id.clone().map(Value::String));
        put(
            "ExitNodeAllowLANAccess",
            self.exit_node_allow_lan_access.map(Value::Bool),
        );
        put("CorpDNS", self.corp_dns.map(Value::Bool));
        put("RunSSH", self.run_ssh.map(Value::Bool));
        put("WantRunning", self.want_running.map(Value::Bool));
        put("ShieldsUp", self.shields_up.map(Value::Bool));
        put("AdvertiseTags", self.advertise_tags.clone().map(Value::from));
        put("AdvertiseRoutes", self.advertise_routes.clone().map(Value::from));
        Value::Object(map)
    }
}

/// Result of `POST check-prefs`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckPrefsResponse {
    pub error: Option<String>,
}

/// Result of `GET derpmap`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DerpMap {
    /// Regions keyed by region ID.
    pub regions: BTreeMap<String, DerpRegion>,
    pub omit_default_regions: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DerpRegion {
    pub region_id: i64,
    pub region_code: String,
    pub region_name: String,
    pub avoid: bool,
    pub nodes: Vec<DerpNode>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DerpNode {
    pub name: String,
    pub region_id: i64,
    pub host_name: String,
    pub ipv4: String,
    pub ipv6: String,
    pub stun_port: i64,
    pub stun_only: bool,
    pub derp_port: i64,
    pub can_port80: bool,
}

/// Ping mechanism for `POST ping`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum PingType {
    /// Disco ping through magicsock.
    #[default]
    Disco,
    /// Ping through the WireGuard tunnel, answered by the peer's engine.
    Tsmp,
    Icmp,
    /// HTTP request to the peer's PeerAPI.
    PeerApi,
    /// Any other mechanism name, sent verbatim (e.g. `taildrop`).
    Other(String),
}

impl PingType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Disco => "disco",
            Self::Tsmp => "TSMP",
            Self::Icmp => "ICMP",
            Self::PeerApi => "peerapi",
            Self::Other(name) => name,
        }
    }
}

impl std::str::FromStr for PingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disco" => Ok(Self::Disco),
            "tsmp" => Ok(Self::Tsmp),
            "icmp" => Ok(Self::Icmp),
            "peerapi" => Ok(Self::PeerApi),
            "" => Err("ping type must not be empty".to_string()),
            _ => Ok(Self::Other(s.to_string())),
        }
    }
}

/// Result of `POST ping`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PingResult {
    pub ip: String,
    pub node_ip: String,
    pub node_name: String,
    pub err: String,
    pub latency_seconds: f64,
    pub endpoint: String,
    pub peer_relay: String,
    pub derp_region_id: i64,
    pub derp_region_code: String,
    pub peer_api_port: u16,
    pub is_local_ip: bool,
}

/// Result of `GET dns-query`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsQueryResponse {
    /// Raw DNS response message, base64 encoded.
    pub bytes: String,
    pub resolvers: Vec<Resolver>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resolver {
    pub addr: String,
    pub bootstrap_resolution: Vec<String>,
    pub use_with_exit_node: bool,
}

/// Result of `GET dns-osconfig`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsOsConfig {
    pub nameservers: Vec<String>,
    pub search_domains: Vec<String>,
    pub match_domains: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginProfile {
    pub id: String,
    pub name: String,
    pub key: String,
    pub user_profile: UserProfile,
    pub node_id: String,
    pub local_user_id: String,
    pub control_url: String,
    pub network_profile: Option<NetworkProfile>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkProfile {
    pub magic_dns_name: String,
    pub domain_name: String,
}

/// The current profile together with all known profiles.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    pub current: Option<LoginProfile>,
    pub profiles: Vec<LoginProfile>,
}

/// Result of `POST reload-config`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReloadConfigResponse {
    pub reloaded: bool,
    #[serde(alias = "error")]
    pub err: Option<String>,
}

/// Result of `GET check-ip-forwarding`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpForwardingCheck {
    pub warning: Option<String>,
}

/// Result of `GET check-so-mark-in-use`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoMarkCheck {
    pub use_so_mark: bool,
}
