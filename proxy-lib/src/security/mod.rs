//! Connection-scoped security: identity (mTLS or plaintext), authorization
//! against the static client policy, and per-(client, app) rate limiting.

pub mod authn;
pub mod authz;
pub mod rate_limit;

pub use authn::{AuthnError, Authenticator, ClientStream, MtlsAuthenticator, PlaintextAuthenticator};
pub use authz::{AuthzError, Authorizer, NoopAuthorizer, PolicyAuthorizer};
