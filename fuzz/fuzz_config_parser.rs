//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`; parse and validation errors
//! are fine, panics are not.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = tslocal_config::AppConfig::parse(s) {
            // A config that parsed must also resolve a socket path.
            let _ = config.client.resolved_socket_path();
            let _ = config.client.timeout();
        }
    }
});
