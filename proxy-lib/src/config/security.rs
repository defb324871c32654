use serde::Deserialize;

/// Security configuration: mTLS on/off and the certificate layout described
/// in spec.md §6.
#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Master switch; when false the proxy accepts plain TCP and every peer
    /// authenticates as `"localhost"`.
    #[serde(default)]
    pub enable_mutual_tls: bool,
    /// Path to the CA certificate (PEM) used to build the client verifier.
    #[serde(default)]
    pub ca_cert: Option<String>,
    /// Path to the server certificate (PEM).
    #[serde(default)]
    pub server_cert: Option<String>,
    /// Path to the server private key (PEM).
    #[serde(default)]
    pub server_key: Option<String>,
    /// Directory containing one subdirectory per client id, each holding
    /// `{clientId}.crt`.
    #[serde(default)]
    pub clients_cert_path: Option<String>,
    /// TLS handshake timeout. Spec leaves this unspecified; default 10s.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Upstream dial timeout. Spec recommends 5s.
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,
    /// Re-enable logging of benign "connection closed" errors during splice
    /// teardown, for debugging.
    #[serde(default)]
    pub log_closed_conn_errors: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_mutual_tls: false,
            ca_cert: None,
            server_cert: None,
            server_key: None,
            clients_cert_path: None,
            handshake_timeout_ms: default_handshake_timeout_ms(),
            dial_timeout_ms: default_dial_timeout_ms(),
            log_closed_conn_errors: false,
        }
    }
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}
