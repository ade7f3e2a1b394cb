//! Fuzz target for response key normalization.
//!
//! Run with: cargo +nightly fuzz run fuzz_normalize
//!
//! Any JSON document must normalize without panicking, keep its shape, and
//! normalize to the same value a second time.

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use tslocal_core::normalize_keys;

fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => x.len() >= y.len(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_shape(a, b))
        }
        (x, y) => x == y,
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let once = normalize_keys(value.clone());
    assert!(same_shape(&value, &once));
    let twice = normalize_keys(once.clone());
    assert_eq!(once, twice);
});
