use thiserror::Error;

use crate::config::ClientPolicy;

/// Why a connection was rejected by the authorizer, distinguished so
/// operators can tell "misconfiguration" from "legitimate deny" (spec §4.4).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("client not configured: {0}")]
    ClientNotConfigured(String),
    #[error("client {client_id} not allowed to access app {app_id}")]
    AppAccessDenied { client_id: String, app_id: String },
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, client_id: &str, app_id: &str) -> Result<(), AuthzError>;
}

/// Authorizes a `(clientId, appId)` pair against the static client policy.
pub struct PolicyAuthorizer {
    policy: ClientPolicy,
}

impl PolicyAuthorizer {
    pub fn new(policy: ClientPolicy) -> Self {
        Self { policy }
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize(&self, client_id: &str, app_id: &str) -> Result<(), AuthzError> {
        let client_id_lc = client_id.to_lowercase();
        let app_id_lc = app_id.to_lowercase();
        match self.policy.is_allowed(&client_id_lc, &app_id_lc) {
            None => Err(AuthzError::ClientNotConfigured(client_id.to_string())),
            Some(true) => Ok(()),
            Some(false) => Err(AuthzError::AppAccessDenied {
                client_id: client_id.to_string(),
                app_id: app_id.to_string(),
            }),
        }
    }
}

/// Always succeeds; used when mTLS is disabled (spec §4.4).
pub struct NoopAuthorizer;

impl Authorizer for NoopAuthorizer {
    fn authorize(&self, _client_id: &str, _app_id: &str) -> Result<(), AuthzError> {
        Ok(())
    }
}
