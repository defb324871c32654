//! Shared test helpers: throwaway certificate generation for mTLS tests.

use std::fs;
use std::path::{Path, PathBuf};

/// A uniquely-named directory under the OS temp dir, left in place for the
/// life of the test process (not cleaned up on drop, since callers pass the
/// path around rather than holding the `TempDir` guard).
pub fn tmp_dir(name: &str) -> PathBuf {
    tempfile::Builder::new()
        .prefix(&format!("proxy-test-{name}-"))
        .tempdir()
        .expect("create temp test dir")
        .keep()
}

/// A self-signed server identity written to PEM files under `dir`. Returns
/// (server_cert_path, server_key_path).
pub fn generate_server_identity(dir: &Path) -> (PathBuf, PathBuf) {
    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).expect("generate server cert");

    let cert_path = dir.join("server.crt");
    let key_path = dir.join("server.key");
    fs::write(&cert_path, cert.pem()).unwrap();
    fs::write(&key_path, signing_key.serialize_pem()).unwrap();

    (cert_path, key_path)
}

/// A self-signed client identity with the given Subject CommonName, written
/// to `base/{common_name}/{common_name}.{crt,key}`. Trusted directly as its
/// own anchor by the server's client-CA pool (spec §6, DESIGN.md). Returns
/// the client's cert and key paths.
pub fn generate_client_identity(base: &Path, common_name: &str) -> (PathBuf, PathBuf) {
    let client_dir = base.join(common_name);
    fs::create_dir_all(&client_dir).expect("create client cert dir");

    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).expect("client cert params");
    let mut dn = rcgen::DistinguishedName::new();
    dn.push(rcgen::DnType::CommonName, common_name);
    params.distinguished_name = dn;
    let key = rcgen::KeyPair::generate().expect("generate client key");
    let cert = params.self_signed(&key).expect("self sign client cert");

    let cert_path = client_dir.join(format!("{common_name}.crt"));
    let key_path = client_dir.join(format!("{common_name}.key"));
    fs::write(&cert_path, cert.pem()).unwrap();
    fs::write(&key_path, key.serialize_pem()).unwrap();

    (cert_path, key_path)
}
