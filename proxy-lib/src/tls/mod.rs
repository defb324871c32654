#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::BufReader;
use std::sync::Arc;

use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::version::TLS13;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;
use tracing::warn;

use crate::config::SecurityConfig;
use crate::error::{ProxyError, Result};

/// Build a TLS 1.3-minimum acceptor that requires and verifies client
/// certificates against the CA certificate and the per-client certificate
/// directory (spec §4.3, §6).
///
/// The `ClientCAs` trust pool is the union of `ca_cert` (a shared anchor, for
/// deployments that issue client certs off one CA) and every `{clientId}.crt`
/// found one directory per client under `clients_cert_path` (each trusted
/// directly as its own anchor, for the self-signed-client model). Failure to
/// load either the CA cert, the server cert/key, or the clients directory
/// itself is fatal to the application (spec §6); failure to load an
/// individual client cert is logged and skipped.
pub fn build_mtls_acceptor(security: &SecurityConfig) -> Result<TlsAcceptor> {
    let ca_cert_path = security
        .ca_cert
        .as_deref()
        .ok_or_else(|| ProxyError::Config("ca_cert is required when mTLS is enabled".into()))?;
    let server_cert_path = security
        .server_cert
        .as_deref()
        .ok_or_else(|| ProxyError::Config("server_cert is required when mTLS is enabled".into()))?;
    let server_key_path = security
        .server_key
        .as_deref()
        .ok_or_else(|| ProxyError::Config("server_key is required when mTLS is enabled".into()))?;
    let clients_cert_path = security.clients_cert_path.as_deref().ok_or_else(|| {
        ProxyError::Config("clients_cert_path is required when mTLS is enabled".into())
    })?;

    let server_certs = load_certs(server_cert_path)?;
    let server_key = load_key(server_key_path)?;
    let mut client_roots = load_client_ca_pool(clients_cert_path)?;
    for cert in load_certs(ca_cert_path)? {
        client_roots
            .add(cert)
            .map_err(|e| ProxyError::Config(format!("failed to add ca_cert '{ca_cert_path}' to trust pool: {e}")))?;
    }

    let client_verifier = WebPkiClientVerifier::builder(Arc::new(client_roots))
        .build()
        .map_err(|e| ProxyError::Tls(format!("failed to build client verifier: {e}")))?;

    let config = ServerConfig::builder_with_protocol_versions(&[&TLS13])
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(server_certs, server_key)
        .map_err(|e| ProxyError::Tls(format!("failed to build tls server config: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Scan `base/{clientId}/{clientId}.crt` for every client subdirectory and
/// add each parseable certificate to the trust pool. A client whose cert is
/// missing or unparsable is logged and skipped (spec §6); the directory
/// itself being absent or unreadable is fatal to the whole application.
fn load_client_ca_pool(base: &str) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    let entries = fs::read_dir(base)
        .map_err(|e| ProxyError::Config(format!("failed to read clients_cert_path '{base}': {e}")))?;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to read client certificate directory entry");
                continue;
            }
        };
        if !entry.path().is_dir() {
            continue;
        }
        let client_id = entry.file_name().to_string_lossy().to_string();
        let cert_path = entry.path().join(format!("{client_id}.crt"));
        match load_certs(&cert_path.to_string_lossy()) {
            Ok(certs) => {
                for cert in certs {
                    if let Err(e) = roots.add(cert) {
                        warn!(%client_id, error = %e, "failed to add client certificate to trust pool");
                    }
                }
            }
            Err(e) => {
                warn!(%client_id, error = %e, "failed to load client certificate, skipping");
            }
        }
    }

    Ok(roots)
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let f = File::open(path).map_err(|e| ProxyError::Config(format!("failed to open cert file '{path}': {e}")))?;
    let mut reader = BufReader::new(f);
    let parsed = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Config(format!("failed to parse certs in '{path}': {e}")))?;
    if parsed.is_empty() {
        return Err(ProxyError::Config(format!("no certificates found in '{path}'")));
    }
    Ok(parsed)
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let f = File::open(path).map_err(|e| ProxyError::Config(format!("failed to open key file '{path}': {e}")))?;
    let mut reader = BufReader::new(f);
    let mut pkcs8 = pkcs8_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Config(format!("failed to read pkcs8 keys in '{path}': {e}")))?;
    if let Some(k) = pkcs8.pop() {
        return Ok(PrivateKeyDer::from(k));
    }

    let f = File::open(path).map_err(|e| ProxyError::Config(format!("failed to open key file '{path}': {e}")))?;
    let mut reader = BufReader::new(f);
    let mut rsa = rsa_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Config(format!("failed to read rsa keys in '{path}': {e}")))?;
    if let Some(k) = rsa.pop() {
        return Ok(PrivateKeyDer::from(k));
    }

    Err(ProxyError::Config(format!("no private key found (pkcs8 or rsa) in '{path}'")))
}

/// Extract and lower-case the Subject CommonName of a DER-encoded leaf
/// certificate (spec §3, §4.3).
pub fn common_name_of(cert_der: &CertificateDer<'_>) -> Result<String> {
    let (_, parsed) = x509_parser::certificate::X509Certificate::from_der(cert_der.as_ref())
        .map_err(|e| ProxyError::Tls(format!("failed to parse peer certificate: {e}")))?;
    let cn = parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .ok_or_else(|| ProxyError::Tls("peer certificate has no Subject CommonName".into()))?;
    Ok(cn.to_lowercase())
}
