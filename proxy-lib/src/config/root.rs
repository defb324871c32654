use serde::Deserialize;

use super::app::AppConfig;
use super::client::ClientsConfig;
use super::rate_limit::RateLimitConfig;
use super::security::SecurityConfig;

/// Top-level static configuration, loaded once at boot and never mutated.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub apps: Vec<AppConfig>,
    #[serde(default)]
    pub clients: ClientsConfig,
    #[serde(default, rename = "default_rate_limit")]
    pub default_rate_limit: RateLimitConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Address the ambient Prometheus-text metrics listener binds to, if
    /// present. Absent means metrics are not served over the network.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}
