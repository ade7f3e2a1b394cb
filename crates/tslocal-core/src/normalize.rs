//! Response key-casing normalization.
//!
//! The daemon speaks Go field names (`HostName`, `TailscaleIPs`) through the
//! CLI, while some daemon versions already emit lower camel over the socket.
//! Every payload is rewritten to lower camel (`hostName`, `tailscaleIps`)
//! before it reaches a caller, so one typed contract serves both transports.
//!
//! The transform is idempotent: its output never contains two adjacent
//! capitals, and on such input segmentation splits exactly before each
//! capital, which re-renders to the same string.

use serde_json::{Map, Value};

/// Recursively normalize every object key in `value`.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (normalize_key(&key), normalize_keys(value)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        scalar => scalar,
    }
}

/// Convert one key to lower camel case.
///
/// Keys that are not plain identifiers (node keys such as `nodekey:1a2b`,
/// IP addresses) are map data rather than field names and come back
/// unchanged, as does any key with no letters or digits.
pub fn normalize_key(key: &str) -> String {
    if !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return key.to_string();
    }

    let words = split_words(key);
    if words.is_empty() {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    for (i, word) in words.iter().enumerate() {
        let after_capital = out.chars().last().is_some_and(|c| c.is_ascii_uppercase());
        if i == 0 || after_capital {
            out.push_str(&word.to_ascii_lowercase());
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(&chars.as_str().to_ascii_lowercase());
            }
        }
    }
    out
}

/// Split an identifier into words.
///
/// `_` separates words. A capital starts a word. An uppercase run is an
/// acronym: when more than one lowercase letter follows it, its last capital
/// begins the next word (`DNSName` → `DNS`, `Name`); a single trailing
/// lowercase letter stays with the acronym (`IPs`, `IPv4`). Digits never
/// start a word.
fn split_words(key: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for chunk in key.split('_').filter(|c| !c.is_empty()) {
        let bytes = chunk.as_bytes();
        let len = bytes.len();
        let mut i = 0;
        while i < len {
            let start = i;
            if bytes[i].is_ascii_uppercase() {
                let mut run_end = i;
                while run_end < len && bytes[run_end].is_ascii_uppercase() {
                    run_end += 1;
                }
                let mut tail_end = run_end;
                while tail_end < len && bytes[tail_end].is_ascii_lowercase() {
                    tail_end += 1;
                }
                if run_end - start >= 2 && tail_end - run_end >= 2 {
                    words.push(&chunk[start..run_end - 1]);
                    i = run_end - 1;
                    continue;
                }
                i = run_end;
            }
            while i < len && (bytes[i].is_ascii_lowercase() || bytes[i].is_ascii_digit()) {
                i += 1;
            }
            words.push(&chunk[start..i]);
        }
    }
    words
}
