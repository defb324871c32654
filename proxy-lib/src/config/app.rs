use serde::Deserialize;

/// A single upstream TCP endpoint that an application load-balances across.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UpstreamRef {
    /// Address in `host:port` form, suitable for `TcpStream::connect`.
    pub address: String,
}

/// One named application: a TCP port fronting a non-empty group of upstreams.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Unique application identifier, used for diagnostics and client policy lookups.
    pub app_id: String,
    /// Port the proxy listens on for this application.
    pub proxy_port: u16,
    /// Upstream servers this application load-balances across. Must be non-empty.
    pub upstreams: Vec<UpstreamRef>,
    /// Per-application rate-limit override. Falls back to `default_rate_limit` when absent.
    #[serde(default)]
    pub rate_limit: Option<super::rate_limit::RateLimitConfig>,
}
