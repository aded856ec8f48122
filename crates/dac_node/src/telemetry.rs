use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Structured, JSON-capable logging initialized once at process start (spec.md §4.9).
/// Trimmed down from the reference workspace's `configure_tracing`: no reload handle, no
/// quieted-library allowlist, no custom timestamp formatter — this binary has one
/// subscriber for its whole lifetime and nothing else mutates its filter at runtime.
pub fn init() {
    let filter = EnvFilter::builder().with_default_directive(tracing::Level::INFO.into()).from_env_lossy();
    let fmt_layer = fmt::layer().json().with_target(true).with_file(true).with_line_number(true);
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    tracing::info!("tracing initialized");
}
