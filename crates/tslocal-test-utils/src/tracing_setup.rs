//! Tracing initialisation helpers for tests.
//!
//! The subscriber is installed at most once per process, so
//! [`init_test_tracing`] can be called from every test.

use tracing_subscriber::EnvFilter;

/// Install a subscriber that writes to the test-harness writer and honors
/// `RUST_LOG` (default `debug` for the tslocal crates).
///
/// ```ignore
/// #[tokio::test]
/// async fn my_test() {
///     tslocal_test_utils::tracing_setup::init_test_tracing();
///     tracing::debug!("visible with --nocapture");
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tslocal_core=debug")),
        )
        .with_test_writer()
        .try_init();
}
