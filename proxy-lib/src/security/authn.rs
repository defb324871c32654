use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::warn;

use crate::tls::common_name_of;

/// A stream whose transport has already completed (or skipped) the identity
/// handshake, ready for the accepted application data to flow over it.
pub enum ClientStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("tls handshake timed out")]
    HandshakeTimeout,
    #[error("tls handshake failed: {0}")]
    Handshake(String),
    #[error("peer presented no certificates")]
    NoPeerCertificate,
    #[error("failed to extract peer identity: {0}")]
    Identity(String),
}

/// Authenticates an accepted raw TCP connection, returning the client's
/// lower-cased identity and a stream ready for data transfer (spec §4.3).
///
/// The handshake is driven explicitly rather than lazily on first read/write,
/// so the identity is known and verified before any application bytes flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, stream: TcpStream) -> Result<(String, ClientStream), AuthnError>;
}

/// mTLS authenticator: drives the server-side TLS handshake under a bounded
/// timeout, requires the peer to present a client certificate, and derives
/// the client identity from its Subject CommonName (spec §3, §4.3).
pub struct MtlsAuthenticator {
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

impl MtlsAuthenticator {
    pub fn new(acceptor: TlsAcceptor, handshake_timeout: Duration) -> Self {
        Self { acceptor, handshake_timeout }
    }
}

#[async_trait]
impl Authenticator for MtlsAuthenticator {
    async fn authenticate(&self, stream: TcpStream) -> Result<(String, ClientStream), AuthnError> {
        let tls_stream = tokio::time::timeout(self.handshake_timeout, self.acceptor.accept(stream))
            .await
            .map_err(|_| AuthnError::HandshakeTimeout)?
            .map_err(|e| AuthnError::Handshake(e.to_string()))?;

        let peer_certs = tls_stream
            .get_ref()
            .1
            .peer_certificates()
            .ok_or(AuthnError::NoPeerCertificate)?;
        let leaf = peer_certs.first().ok_or(AuthnError::NoPeerCertificate)?;
        let identity = common_name_of(leaf).map_err(|e| AuthnError::Identity(e.to_string()))?;

        Ok((identity, ClientStream::Tls(Box::new(tls_stream))))
    }
}

/// No-identity authenticator used when mTLS is disabled for an application;
/// every connection is treated as the fixed identity `"localhost"` (spec §4.3,
/// mirroring the original implementation's `NoSecurity` mode).
pub struct PlaintextAuthenticator;

#[async_trait]
impl Authenticator for PlaintextAuthenticator {
    async fn authenticate(&self, stream: TcpStream) -> Result<(String, ClientStream), AuthnError> {
        Ok(("localhost".to_string(), ClientStream::Plain(stream)))
    }
}

pub fn log_handshake_failure(client_addr: std::net::SocketAddr, err: &AuthnError, log_closed_conn_errors: bool) {
    let is_closed = matches!(err, AuthnError::Handshake(msg) if msg.contains("close_notify") || msg.contains("UnexpectedEof"));
    if is_closed && !log_closed_conn_errors {
        return;
    }
    warn!(peer = %client_addr, error = %err, "tls handshake failed");
}
