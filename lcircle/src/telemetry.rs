//! Tracing subscriber setup.
//!
//! Log levels are controlled through `RUST_LOG`; the default keeps the
//! application chatty and its HTTP plumbing quieter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops (tests share one process).
pub fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lcircle=debug,tower_http=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
