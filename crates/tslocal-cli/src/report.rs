//! Health report: status, profile, prefs, DERP map and the device list.
//!
//! A status failure aborts the report; every later section is a check that
//! may fail on its own.

use std::io::Write;

use anyhow::{Context, Result};
use tslocal_core::LocalApiClient;
use tslocal_core::types::PeerStatus;

/// Write the report to `out`. Returns whether every check passed.
pub async fn run(client: &LocalApiClient, out: &mut impl Write) -> Result<bool> {
    let mut passed = true;
    writeln!(out, "=== Tailscale LocalAPI report ({}) ===\n", client.transport_name())?;

    writeln!(out, "1. Status:")?;
    let status = client.status(true).await.context("fetching status")?;
    let me = status.self_status.clone().unwrap_or_default();
    writeln!(out, "   Version: {}", status.version)?;
    writeln!(out, "   Backend state: {:?}", status.backend_state)?;
    writeln!(
        out,
        "   Self: {} ({})",
        me.dns_name,
        me.tailscale_ips.first().map_or("N/A", String::as_str)
    )?;
    writeln!(out, "   Peers: {}", status.peer.len())?;

    writeln!(out, "\n2. Current profile:")?;
    match client.current_profile().await {
        Some(profile) => {
            writeln!(out, "   ID: {}", profile.id)?;
            writeln!(out, "   Name: {}", profile.name)?;
            writeln!(out, "   Login: {}", or_na(&profile.user_profile.login_name))?;
        }
        None => writeln!(out, "   No profile found")?,
    }

    writeln!(out, "\n3. Preferences:")?;
    match client.prefs().await {
        Ok(prefs) => writeln!(out, "   Hostname: {}", or_na(&prefs.hostname))?,
        Err(e) => {
            writeln!(out, "   FAILED to fetch preferences: {e}")?;
            passed = false;
        }
    }

    writeln!(out, "\n4. DERP map:")?;
    match client.derp_map().await {
        Ok(map) => writeln!(out, "   Regions: {}", map.regions.len())?,
        Err(e) => {
            writeln!(out, "   FAILED to fetch DERP map: {e}")?;
            passed = false;
        }
    }

    writeln!(out, "\n5. Tailnet devices:")?;
    let mut any = false;
    for (index, (device, is_self)) in status.devices().enumerate() {
        any = true;
        write_device(out, index + 1, device, is_self)?;
    }
    if !any {
        writeln!(out, "   No devices found")?;
    }

    writeln!(
        out,
        "\n=== {} ===",
        if passed {
            "All checks passed"
        } else {
            "Some checks failed (see above)"
        }
    )?;
    Ok(passed)
}

fn write_device(
    out: &mut impl Write,
    number: usize,
    device: &PeerStatus,
    is_self: bool,
) -> std::io::Result<()> {
    let name = [&device.dns_name, &device.host_name]
        .into_iter()
        .find(|s| !s.is_empty())
        .map_or("Unknown", String::as_str);
    let ips = if device.tailscale_ips.is_empty() {
        "N/A".to_string()
    } else {
        device.tailscale_ips.join(", ")
    };
    let state = if device.online {
        "Online".to_string()
    } else {
        format!("Offline (last seen: {})", or_na(&device.last_seen))
    };

    writeln!(
        out,
        "   {number}. {name}{}",
        if is_self { " (current device)" } else { "" }
    )?;
    writeln!(out, "      IPs: {ips}")?;
    let os = if device.os.is_empty() {
        "Unknown"
    } else {
        device.os.as_str()
    };
    writeln!(out, "      OS: {os}")?;
    writeln!(out, "      Status: {state}\n")
}

fn or_na(s: &str) -> &str {
    if s.is_empty() { "N/A" } else { s }
}
