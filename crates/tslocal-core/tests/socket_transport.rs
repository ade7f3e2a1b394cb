//! Socket transport against a fake daemon on a temporary Unix socket.

use std::time::Duration;

use hyper::Method;
use pretty_assertions::assert_eq;
use serde_json::json;
use tslocal_core::types::{BackendState, PartialPrefs, PingType};
use tslocal_core::{Endpoint, LocalApiClient, LocalApiError};
use tslocal_test_utils::{CannedResponse, FakeDaemon};

fn sample_status() -> serde_json::Value {
    json!({
        "Version": "1.70.0",
        "BackendState": "Running",
        "TailscaleIPs": ["100.64.0.1"],
        "Self": { "HostName": "laptop", "DNSName": "laptop.example.ts.net.", "Online": true },
        "Peer": {
            "nodekey:abcd": { "HostName": "phone", "TailscaleIPs": ["100.64.0.2"], "OS": "android" }
        }
    })
}

#[test_log::test(tokio::test)]
async fn test_status_round_trip() {
    let daemon = FakeDaemon::start().await;
    daemon.respond_json("status", sample_status());

    let client = daemon.client();
    assert_eq!(client.transport_name(), "socket");

    let status = client.status(true).await.unwrap();
    assert_eq!(status.backend_state, BackendState::Running);
    assert_eq!(status.tailscale_ips, vec!["100.64.0.1"]);
    assert_eq!(status.self_status.unwrap().host_name, "laptop");
    assert_eq!(status.peer["nodekey:abcd"].os, "android");

    let requests = daemon.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/localapi/v0/status");
    assert_eq!(requests[0].host.as_deref(), Some("local-tailscaled.sock"));
    assert_eq!(requests[0].content_type, None);
}

#[test_log::test(tokio::test)]
async fn test_raw_request_is_normalized() {
    let daemon = FakeDaemon::start().await;
    daemon.respond_json("status", sample_status());

    let value = daemon
        .client()
        .request(&Endpoint::get("status").query("peers", "false"))
        .await
        .unwrap();
    assert_eq!(value["backendState"], json!("Running"));
    assert_eq!(value["self"]["dnsName"], json!("laptop.example.ts.net."));
    assert!(value["peer"].get("nodekey:abcd").is_some());
    assert_eq!(daemon.requests()[0].target, "/localapi/v0/status?peers=false");
}

#[test_log::test(tokio::test)]
async fn test_no_content_is_empty_object() {
    let daemon = FakeDaemon::start().await;
    daemon.respond(Method::POST, "logout", CannedResponse::no_content());

    let client = daemon.client();
    assert_eq!(
        client.request(&Endpoint::post("logout")).await.unwrap(),
        json!({})
    );
    client.logout().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_status_codes_are_classified() {
    let daemon = FakeDaemon::start().await;
    daemon
        .respond(
            Method::GET,
            "whois",
            CannedResponse::status(404, "no match for IP:port"),
        )
        .respond(Method::GET, "prefs", CannedResponse::status(403, ""))
        .respond(
            Method::POST,
            "start",
            CannedResponse::status(412, "not in NeedsLogin state"),
        )
        .respond(Method::GET, "derpmap", CannedResponse::status(500, "boom"));
    let client = daemon.client();

    match client.whois("100.64.0.9").await {
        Err(LocalApiError::PeerNotFound(body)) => assert_eq!(body, "no match for IP:port"),
        other => panic!("expected PeerNotFound, got {other:?}"),
    }
    match client.prefs().await {
        Err(LocalApiError::AccessDenied(body)) => assert_eq!(body, "Access denied"),
        other => panic!("expected AccessDenied, got {other:?}"),
    }
    assert!(matches!(
        client.start(json!({})).await,
        Err(LocalApiError::PreconditionsFailed(_))
    ));
    match client.derp_map().await {
        Err(LocalApiError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_timeout_drops_request() {
    let daemon = FakeDaemon::start().await;
    daemon.respond(
        Method::GET,
        "status",
        CannedResponse::json(json!({})).with_delay(Duration::from_secs(5)),
    );
    let client = LocalApiClient::new(daemon.config().with_timeout(Duration::from_millis(100)));

    let started = std::time::Instant::now();
    let result = client.status(true).await;
    assert!(matches!(result, Err(LocalApiError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(2));

    // The connection closes with the call, so the daemon drops its handler
    // well before the delay runs out.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while daemon.cancelled().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(daemon.cancelled(), vec!["/localapi/v0/status"]);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test_log::test(tokio::test)]
async fn test_missing_socket_names_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.sock");
    let client = LocalApiClient::new(
        tslocal_core::ClientConfig::default()
            .with_socket_path(&path)
            .with_transport(tslocal_core::TransportPreference::Socket),
    );

    let err = client.status(true).await.unwrap_err();
    assert!(err.is_connectivity());
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test_log::test(tokio::test)]
async fn test_json_body_reaches_daemon() {
    let daemon = FakeDaemon::start().await;
    daemon.respond(
        Method::PATCH,
        "prefs",
        CannedResponse::json(json!({"Hostname": "box", "RunSSH": true})),
    );

    let prefs = daemon
        .client()
        .edit_prefs(&PartialPrefs {
            hostname: Some("box".into()),
            run_ssh: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(prefs.hostname, "box");
    assert!(prefs.run_ssh);

    let requests = daemon.requests();
    let request = &requests[0];
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        sent,
        json!({"Hostname": "box", "HostnameSet": true, "RunSSH": true, "RunSSHSet": true})
    );
}

#[test_log::test(tokio::test)]
async fn test_arguments_are_escaped() {
    let daemon = FakeDaemon::start().await;
    daemon
        .respond(Method::POST, "ping", CannedResponse::json(json!({"IP": "fd7a::2"})))
        .respond(Method::DELETE, "profiles", CannedResponse::no_content());
    let client = daemon.client();

    client.ping("fd7a::2", PingType::Icmp, None).await.unwrap();
    // Registered without the segment, so the fake answers 404.
    assert!(matches!(
        client.delete_profile("a b/c").await,
        Err(LocalApiError::PeerNotFound(_))
    ));

    let targets: Vec<_> = daemon.requests().into_iter().map(|r| r.target).collect();
    assert_eq!(
        targets,
        vec![
            "/localapi/v0/ping?ip=fd7a%3A%3A2&type=ICMP",
            "/localapi/v0/profiles/a%20b%2Fc",
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_metrics_text_is_returned_raw() {
    let metrics =
        "# TYPE tailscaled_inbound_bytes_total counter\ntailscaled_inbound_bytes_total 42\n";
    let daemon = FakeDaemon::start().await;
    daemon.respond(Method::GET, "usermetrics", CannedResponse::text(metrics));

    assert_eq!(daemon.client().user_metrics().await.unwrap(), metrics);
}

#[test_log::test(tokio::test)]
async fn test_current_profile_none_on_failure() {
    let daemon = FakeDaemon::start().await;
    let client = daemon.client();
    // No route registered: the fake answers 404.
    assert_eq!(client.current_profile().await, None);

    drop(daemon);
    assert_eq!(client.current_profile().await, None);
}

#[test_log::test(tokio::test)]
async fn test_profile_status() {
    let daemon = FakeDaemon::start().await;
    daemon
        .respond_json(
            "profiles/current",
            json!({"ID": "p1", "Name": "alice@example.com"}),
        )
        .respond_json(
            "profiles",
            json!([
                {"ID": "p1", "Name": "alice@example.com"},
                {"ID": "p2", "Name": "work@example.com"}
            ]),
        );

    let status = daemon.client().profile_status().await.unwrap();
    assert_eq!(status.current.unwrap().id, "p1");
    let names: Vec<_> = status.profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alice@example.com", "work@example.com"]);
}

#[test_log::test(tokio::test)]
async fn test_empty_whois_sends_nothing() {
    let daemon = FakeDaemon::start().await;
    assert!(matches!(
        daemon.client().whois("").await,
        Err(LocalApiError::InvalidArgument(_))
    ));
    assert!(daemon.requests().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_concurrent_calls_share_client() {
    let daemon = FakeDaemon::start().await;
    daemon
        .respond_json("status", sample_status())
        .respond_json("derpmap", json!({"Regions": {"1": {"RegionID": 1}}}));
    let client = daemon.client();
    let cloned = client.clone();

    let (status, derp, other) = tokio::join!(
        client.status(false),
        client.derp_map(),
        cloned.status(true)
    );
    assert_eq!(status.unwrap().version, "1.70.0");
    assert_eq!(derp.unwrap().regions["1"].region_id, 1);
    assert!(other.is_ok());
    assert_eq!(daemon.requests().len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_null_collections_from_daemon() {
    let daemon = FakeDaemon::start().await;
    daemon
        .respond_json(
            "status?peers=false",
            json!({
                "BackendState": "Running",
                "TailscaleIPs": ["100.64.0.1"],
                "Health": null,
                "CertDomains": null,
                "Peer": null,
                "User": null,
                "ClientVersion": null,
                "Self": { "HostName": "laptop", "Addrs": null, "Tags": null, "SSH_HostKeys": null }
            }),
        )
        .respond_json(
            "prefs",
            json!({ "Hostname": "box", "AdvertiseTags": null, "AdvertiseRoutes": null }),
        )
        .respond_json(
            "whois",
            json!({
                "Node": {
                    "Name": "phone.example.ts.net.",
                    "Addresses": null,
                    "Endpoints": null,
                    "Tags": null,
                    "Hostinfo": { "OS": "iOS", "Services": null }
                },
                "UserProfile": null,
                "CapMap": null
            }),
        )
        .respond_json(
            "derpmap",
            json!({ "Regions": { "1": { "RegionCode": "nyc", "Nodes": null } } }),
        );
    let client = daemon.client();

    let status = client.status_without_peers().await.unwrap();
    assert_eq!(status.backend_state, BackendState::Running);
    assert!(status.peer.is_empty() && status.cert_domains.is_empty());
    let me = status.self_status.unwrap();
    assert_eq!(me.host_name, "laptop");
    assert!(me.addrs.is_empty() && me.tags.is_empty());

    let prefs = client.prefs().await.unwrap();
    assert_eq!(prefs.hostname, "box");
    assert!(prefs.advertise_tags.is_empty() && prefs.advertise_routes.is_empty());

    let whois = client.whois("100.64.0.2").await.unwrap();
    let node = whois.node.unwrap();
    assert_eq!(node.name, "phone.example.ts.net.");
    assert!(node.addresses.is_empty() && node.hostinfo.services.is_empty());
    assert_eq!(whois.user_profile, None);

    let map = client.derp_map().await.unwrap();
    assert!(map.regions["1"].nodes.is_empty());

    // The raw payload keeps the nulls.
    let raw = client
        .request(&Endpoint::get("status").query("peers", "false"))
        .await
        .unwrap();
    assert_eq!(raw["peer"], serde_json::Value::Null);
}
