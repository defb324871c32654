use std::fs;
use std::path::Path;

use super::root::Config;
use crate::error::{ProxyError, Result};

/// Parse and minimally validate a configuration file.
///
/// Only process-wide concerns are checked here (the security section must be
/// internally consistent, since every application shares one mTLS setup).
/// Per-application concerns (empty upstream list, a rate-limit cap of zero)
/// are deliberately left to the supervisor, which starts each `AppConfig`
/// independently and may fail one without affecting the others (spec §7).
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let text = fs::read_to_string(path)
        .map_err(|e| ProxyError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config =
        toml::from_str(&text).map_err(|e| ProxyError::Config(format!("failed to parse config: {e}")))?;
    validate_security(&cfg)?;
    Ok(cfg)
}

fn validate_security(cfg: &Config) -> Result<()> {
    if !cfg.security.enable_mutual_tls {
        return Ok(());
    }
    let missing = [
        ("ca_cert", cfg.security.ca_cert.is_none()),
        ("server_cert", cfg.security.server_cert.is_none()),
        ("server_key", cfg.security.server_key.is_none()),
        ("clients_cert_path", cfg.security.clients_cert_path.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, is_missing)| is_missing.then_some(name))
    .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(ProxyError::Config(format!(
            "enable_mutual_tls is true but missing fields: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
