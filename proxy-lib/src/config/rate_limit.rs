use serde::Deserialize;

/// Configuration for one rate-limit scope.
///
/// `max_open_connections` and `max_rate_amount` use `-1` as an "unbounded"
/// sentinel; `0` for `max_open_connections` disables the application at
/// construction time (spec: "0 disables the path entirely, meaning the
/// application is rejected at construction").
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: i64,
    #[serde(default = "default_max_rate_amount")]
    pub max_rate_amount: i64,
    #[serde(default = "default_max_rate_period_seconds")]
    pub max_rate_period_seconds: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_open_connections: default_max_open_connections(),
            max_rate_amount: default_max_rate_amount(),
            max_rate_period_seconds: default_max_rate_period_seconds(),
        }
    }
}

impl RateLimitConfig {
    pub fn open_connections_enabled(&self) -> bool {
        self.max_open_connections >= 0
    }

    pub fn rate_enabled(&self) -> bool {
        self.max_rate_amount >= 0
    }
}

fn default_max_open_connections() -> i64 {
    -1
}

fn default_max_rate_amount() -> i64 {
    -1
}

fn default_max_rate_period_seconds() -> u32 {
    1
}
