//! Driver location tracking service.
//!
//! Collects position reports from driver devices and answers history,
//! nearby-driver and logged-route queries over HTTP.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod store;

use crate::{api::AppState, config::ServerConfig, error::ApiError};

#[derive(Parser, Debug)]
#[command(version, about = "Driver location tracking service", long_about = None)]
struct Args {
    #[arg(long, short, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Address to bind to, overrides the configuration file")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let bind = config.bind;
    let app = api::router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot bind {bind}: {e}")))?;
    info!("Tracking service listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Tracking service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
