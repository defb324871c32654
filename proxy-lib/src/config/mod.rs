mod app;
mod client;
mod loader;
mod rate_limit;
mod root;
mod security;

pub use app::{AppConfig, UpstreamRef};
pub use client::{ClientPolicy, ClientsConfig};
pub use loader::load_from_path;
pub use rate_limit::RateLimitConfig;
pub use root::Config;
pub use security::SecurityConfig;

use crate::error::{ProxyError, Result};

/// Per-application validation, run independently for each `AppConfig` at
/// supervisor boot time so that a single misconfigured application does not
/// prevent the others from starting (spec §7: "Fail that application's
/// startup; other apps continue").
pub fn validate_app(app: &AppConfig, effective_rate_limit: &RateLimitConfig) -> Result<()> {
    if app.upstreams.is_empty() {
        return Err(ProxyError::Config(format!(
            "application '{}' has no upstreams configured",
            app.app_id
        )));
    }
    if effective_rate_limit.max_open_connections == 0 {
        return Err(ProxyError::Config(format!(
            "application '{}' has max_open_connections = 0, rejecting at construction",
            app.app_id
        )));
    }
    if effective_rate_limit.max_rate_period_seconds == 0 {
        return Err(ProxyError::Config(format!(
            "application '{}' has max_rate_period_seconds = 0",
            app.app_id
        )));
    }
    Ok(())
}
