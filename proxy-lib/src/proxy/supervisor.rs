use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::{self, ClientPolicy, Config};
use crate::proxy::app::AppProxy;
use crate::security::authn::{MtlsAuthenticator, PlaintextAuthenticator};
use crate::security::rate_limit::{RateLimitRegistry, SystemClock};
use crate::security::{Authenticator, Authorizer, NoopAuthorizer, PolicyAuthorizer};
use crate::telemetry::{serve_metrics, ConnectionCounters};
use crate::tls::build_mtls_acceptor;

/// Boots one [`AppProxy`] per configured application, binding its listener
/// and skipping (with a logged error) any application that fails its
/// per-application validation or fails to bind, so a single bad application
/// does not prevent the others from starting (spec §7).
pub struct Supervisor {
    handles: Vec<tokio::task::JoinHandle<()>>,
    metrics_handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    pub async fn boot(config: Config) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        let authenticator: Arc<dyn Authenticator> = if config.security.enable_mutual_tls {
            match build_mtls_acceptor(&config.security) {
                Ok(acceptor) => Arc::new(MtlsAuthenticator::new(
                    acceptor,
                    Duration::from_millis(config.security.handshake_timeout_ms),
                )),
                Err(e) => {
                    error!(error = %e, "failed to build mTLS acceptor, no applications will start");
                    return Self { handles, metrics_handle: None, shutdown_tx };
                }
            }
        } else {
            Arc::new(PlaintextAuthenticator)
        };

        let authorizer: Arc<dyn Authorizer> = if config.security.enable_mutual_tls {
            Arc::new(PolicyAuthorizer::new(ClientPolicy::from_config(&config.clients)))
        } else {
            Arc::new(NoopAuthorizer)
        };

        let dial_timeout = Duration::from_millis(config.security.dial_timeout_ms);
        let log_closed_conn_errors = config.security.log_closed_conn_errors;
        let mut all_counters: Vec<Arc<ConnectionCounters>> = Vec::new();

        for app in &config.apps {
            let effective_rate_limit = app.rate_limit.unwrap_or(config.default_rate_limit);

            if let Err(e) = config::validate_app(app, &effective_rate_limit) {
                error!(app = %app.app_id, error = %e, "application failed validation, skipping");
                continue;
            }

            let listener = match TcpListener::bind(("0.0.0.0", app.proxy_port)).await {
                Ok(l) => l,
                Err(e) => {
                    error!(app = %app.app_id, port = app.proxy_port, error = %e, "failed to bind listener, skipping");
                    continue;
                }
            };

            let rate_limits = Arc::new(RateLimitRegistry::new(
                app.app_id.clone(),
                effective_rate_limit,
                Arc::new(SystemClock),
            ));

            let counters = Arc::new(ConnectionCounters::new(app.app_id.clone()));
            all_counters.push(Arc::clone(&counters));

            let app_proxy = AppProxy::new(
                app,
                listener,
                Arc::clone(&authenticator),
                Arc::clone(&authorizer),
                rate_limits,
                dial_timeout,
                log_closed_conn_errors,
                counters,
            );

            info!(app = %app.app_id, port = app.proxy_port, "application listening");

            let rx = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                app_proxy.run(rx).await;
            }));
        }

        let metrics_handle = match &config.metrics_addr {
            Some(addr) => match addr.parse() {
                Ok(addr) => Some(tokio::spawn(async move {
                    if let Err(e) = serve_metrics(addr, all_counters).await {
                        error!(error = %e, "metrics listener exited with error");
                    }
                })),
                Err(e) => {
                    error!(%addr, error = %e, "invalid metrics_addr, metrics will not be served");
                    None
                }
            },
            None => None,
        };

        Self { handles, metrics_handle, shutdown_tx }
    }

    /// Signal every running application to stop its accept loop and wait for
    /// them to finish in-flight work. The metrics listener has no graceful
    /// stop condition of its own, so it is aborted directly.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        if let Some(handle) = self.metrics_handle {
            handle.abort();
        }
    }

    pub fn application_count(&self) -> usize {
        self.handles.len()
    }
}
