use std::collections::{HashMap, HashSet};

use serde::Deserialize;

/// Raw `clientId -> [appId]` mapping as it appears in the config file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct ClientsConfig(pub HashMap<String, Vec<String>>);

/// Normalized, immutable client policy: lower-cased client id to the set of
/// lower-cased application ids that client may reach.
///
/// Normalizing once at load time (rather than on every `authorize` call, as
/// the Go source does) keeps the hot path a plain `HashSet::contains`.
#[derive(Debug, Clone, Default)]
pub struct ClientPolicy {
    allowed: HashMap<String, HashSet<String>>,
}

impl ClientPolicy {
    pub fn from_config(clients: &ClientsConfig) -> Self {
        let mut allowed = HashMap::with_capacity(clients.0.len());
        for (client_id, app_ids) in &clients.0 {
            let apps = app_ids.iter().map(|a| a.to_lowercase()).collect();
            allowed.insert(client_id.to_lowercase(), apps);
        }
        Self { allowed }
    }

    /// `None` means the client is not configured at all (distinct from "configured,
    /// but not allowed this app"); both `client_id` and `app_id` are expected
    /// already lower-cased by the caller.
    pub fn is_allowed(&self, client_id: &str, app_id: &str) -> Option<bool> {
        self.allowed
            .get(client_id)
            .map(|apps| apps.contains(app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_on_load() {
        let mut raw = HashMap::new();
        raw.insert("One.COM".to_string(), vec!["Echo".to_string()]);
        let policy = ClientPolicy::from_config(&ClientsConfig(raw));
        assert_eq!(policy.is_allowed("one.com", "echo"), Some(true));
        assert_eq!(policy.is_allowed("one.com", "billing"), Some(false));
        assert_eq!(policy.is_allowed("unknown.com", "echo"), None);
    }
}
