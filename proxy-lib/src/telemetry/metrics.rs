use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Per-application connection counters, grounded on the teacher's
/// `ConnectionCount` (current/total/errors) and widened with a rate-limit
/// denial counter, since that is the one additional outcome this proxy's
/// state machine distinguishes that the teacher's TCP path does not (spec §6:
/// "current/total/errors/rate-limit denials").
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    app_id: String,
    current: AtomicUsize,
    total: AtomicUsize,
    errors: AtomicUsize,
    rate_limited: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionSnapshot {
    pub current: usize,
    pub total: usize,
    pub errors: usize,
    pub rate_limited: usize,
}

impl ConnectionCounters {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self { app_id: app_id.into(), ..Default::default() }
    }

    pub fn accepted(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn closed(&self) {
        self.current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .ok();
    }

    pub fn errored(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            current: self.current.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
        }
    }

    fn to_prometheus(&self) -> String {
        let snap = self.snapshot();
        format!(
            "proxy_connections_active{{app=\"{app}\"}} {current}\n\
             proxy_connections_total{{app=\"{app}\"}} {total}\n\
             proxy_connections_errors_total{{app=\"{app}\"}} {errors}\n\
             proxy_connections_rate_limited_total{{app=\"{app}\"}} {rate_limited}\n",
            app = self.app_id,
            current = snap.current,
            total = snap.total,
            errors = snap.errors,
            rate_limited = snap.rate_limited,
        )
    }
}

/// Serve every application's counters as Prometheus exposition text on a
/// single listener until the process exits (spec §6, ambient observability
/// surface).
pub async fn serve_metrics(addr: SocketAddr, counters: Vec<Arc<ConnectionCounters>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    loop {
        let (mut stream, _peer) = listener.accept().await?;
        let mut body = String::from(
            "# HELP proxy_connections_active Active connections per application\n\
             # TYPE proxy_connections_active gauge\n\
             # HELP proxy_connections_total Connections accepted per application\n\
             # TYPE proxy_connections_total counter\n\
             # HELP proxy_connections_errors_total Connections that ended with an error, per application\n\
             # TYPE proxy_connections_errors_total counter\n\
             # HELP proxy_connections_rate_limited_total Connections denied by rate limiting, per application\n\
             # TYPE proxy_connections_rate_limited_total counter\n",
        );
        for c in &counters {
            body.push_str(&c.to_prometheus());
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain; version=0.0.4\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        tokio::spawn(async move {
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}
