//! Shared helpers for the probar-mvc integration tests.

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness; `RUST_LOG=probar_mvc=debug`
/// shows the controller lifecycle.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
