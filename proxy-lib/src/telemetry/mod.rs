//! Structured logging setup and the process-wide metrics surface.

mod metrics;

pub use metrics::{serve_metrics, ConnectionCounters, ConnectionSnapshot};

/// Install a `tracing` subscriber reading `RUST_LOG` (default `info`), the
/// same convention the teacher binary used for its CLI entrypoint.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
