use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::proxy::splice::splice;
use crate::routing::UpstreamRouter;
use crate::security::authn::{log_handshake_failure, ClientStream};
use crate::security::{Authenticator, Authorizer, AuthzError};
use crate::security::rate_limit::RateLimitRegistry;
use crate::telemetry::ConnectionCounters;

trait IoStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoStream for T {}
type BoxedIo = Box<dyn IoStream>;

/// Drives one application's accept loop end to end: authenticate, authorize,
/// admit against the rate limit budget, route to the least-loaded upstream,
/// dial, splice (spec §4, state machine `ACCEPTED -> AUTHED -> AUTHORIZED ->
/// BUDGETED -> ROUTED -> SPLICING -> DRAINING -> CLOSED`).
pub struct AppProxy {
    app_id: String,
    listener: TcpListener,
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn Authorizer>,
    rate_limits: Arc<RateLimitRegistry>,
    router: Arc<UpstreamRouter>,
    dial_timeout: Duration,
    log_closed_conn_errors: bool,
    counters: Arc<ConnectionCounters>,
}

impl AppProxy {
    pub fn new(
        config: &AppConfig,
        listener: TcpListener,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
        rate_limits: Arc<RateLimitRegistry>,
        dial_timeout: Duration,
        log_closed_conn_errors: bool,
        counters: Arc<ConnectionCounters>,
    ) -> Self {
        let router = Arc::new(UpstreamRouter::new(&config.upstreams));
        Self {
            app_id: config.app_id.clone(),
            listener,
            authenticator,
            authorizer,
            rate_limits,
            router,
            dial_timeout,
            log_closed_conn_errors,
            counters,
        }
    }

    pub fn counters(&self) -> Arc<ConnectionCounters> {
        Arc::clone(&self.counters)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let accepted = tokio::select! {
                res = self.listener.accept() => res,
                res = shutdown.changed() => {
                    if res.is_ok() {
                        info!(app = %self.app_id, "shutdown signal received, stopping accept loop");
                        break;
                    }
                    continue;
                }
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(app = %self.app_id, error = %e, "failed to accept connection");
                    continue;
                }
            };

            let app_id = self.app_id.clone();
            let authenticator = Arc::clone(&self.authenticator);
            let authorizer = Arc::clone(&self.authorizer);
            let rate_limits = Arc::clone(&self.rate_limits);
            let router = Arc::clone(&self.router);
            let dial_timeout = self.dial_timeout;
            let log_closed_conn_errors = self.log_closed_conn_errors;
            let counters = Arc::clone(&self.counters);
            counters.accepted();

            tokio::spawn(async move {
                handle_connection(
                    app_id,
                    stream,
                    peer,
                    authenticator,
                    authorizer,
                    rate_limits,
                    router,
                    dial_timeout,
                    log_closed_conn_errors,
                    counters,
                )
                .await;
            });
        }
    }
}

/// Decrements [`ConnectionCounters`]'s active count exactly once regardless
/// of which exit path `handle_connection` takes.
struct ActiveGuard(Arc<ConnectionCounters>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.closed();
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    app_id: String,
    stream: TcpStream,
    peer: std::net::SocketAddr,
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn Authorizer>,
    rate_limits: Arc<RateLimitRegistry>,
    router: Arc<UpstreamRouter>,
    dial_timeout: Duration,
    log_closed_conn_errors: bool,
    counters: Arc<ConnectionCounters>,
) {
    let _active = ActiveGuard(Arc::clone(&counters));

    let (client_id, client_stream) = match authenticator.authenticate(stream).await {
        Ok(pair) => pair,
        Err(e) => {
            log_handshake_failure(peer, &e, log_closed_conn_errors);
            counters.errored();
            return;
        }
    };

    if let Err(e) = authorizer.authorize(&client_id, &app_id) {
        match &e {
            AuthzError::ClientNotConfigured(_) => {
                warn!(app = %app_id, client = %client_id, %peer, "rejecting connection: client not configured");
            }
            AuthzError::AppAccessDenied { .. } => {
                warn!(app = %app_id, client = %client_id, %peer, "rejecting connection: client not authorized for app");
            }
        }
        return;
    }

    let manager = rate_limits.get_or_create(&client_id);
    let Some(_rate_guard) = manager.try_admit() else {
        warn!(app = %app_id, client = %client_id, %peer, "rejecting connection: rate limit exceeded");
        counters.rate_limited();
        return;
    };

    let upstream_guard = match router.acquire() {
        Ok(guard) => guard,
        Err(e) => {
            warn!(app = %app_id, client = %client_id, error = %e, "rejecting connection: no route available");
            counters.errored();
            return;
        }
    };

    let upstream_addr = upstream_guard.address().to_string();
    let upstream = match timeout(dial_timeout, TcpStream::connect(&upstream_addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            warn!(app = %app_id, client = %client_id, upstream = %upstream_addr, error = %e, "failed to dial upstream");
            counters.errored();
            return;
        }
        Err(_) => {
            warn!(app = %app_id, client = %client_id, upstream = %upstream_addr, "dial timed out");
            counters.errored();
            return;
        }
    };

    info!(app = %app_id, client = %client_id, %peer, upstream = %upstream_addr, "connection routed");

    let client: BoxedIo = match client_stream {
        ClientStream::Plain(s) => Box::new(s),
        ClientStream::Tls(s) => Box::new(s),
    };

    if let Err(e) = splice(client, upstream).await {
        if log_closed_conn_errors || !is_closed_connection_error(&e) {
            warn!(app = %app_id, client = %client_id, upstream = %upstream_addr, error = %e, "connection ended with error");
        }
        counters.errored();
    } else {
        info!(app = %app_id, client = %client_id, upstream = %upstream_addr, "connection closed");
    }
}

fn is_closed_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}
