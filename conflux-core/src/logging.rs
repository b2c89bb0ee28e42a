//! Structured logging init. Every crate logs through `tracing`; this is the
//! one place that wires up a subscriber, so binaries call it exactly once.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install a global `tracing` subscriber: `RUST_LOG`-driven level filtering
/// plus a plain-text formatter. Idempotent to call more than once from tests
/// — subsequent calls are no-ops once a global subscriber is set.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false);

    let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}
