#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod telemetry;
pub mod tls;

pub use config::{load_from_path, Config};
pub use error::{ProxyError, Result};
pub use proxy::Supervisor;
