use thiserror::Error;

/// Errors that can occur in the proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("application has no upstreams configured")]
    NoUpstreams,
}

pub type Result<T> = std::result::Result<T, ProxyError>;
