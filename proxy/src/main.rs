#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use proxy_lib::telemetry::init_tracing;
use proxy_lib::{config::load_from_path, proxy::Supervisor};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "TCP reverse proxy with mTLS authentication and per-client rate limiting")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "config/basic.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(apps = config.apps.len(), "configuration loaded");

    let supervisor = Supervisor::boot(config).await;
    info!(applications = supervisor.application_count(), "proxy started");

    if tokio::signal::ctrl_c().await.is_err() {
        error!("failed to install ctrl-c handler, shutting down immediately");
    } else {
        info!("shutdown signal received");
    }

    supervisor.shutdown().await;
    info!("proxy stopped");
}
