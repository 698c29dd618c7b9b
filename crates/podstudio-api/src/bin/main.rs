//! Podstudio API server
//!
//! # Usage
//!
//! ```bash
//! # Defaults: listen on 0.0.0.0:5000
//! podstudio-server
//!
//! # From a config file, with a flag override
//! podstudio-server --config podstudio.toml --bind 127.0.0.1:8080 --json-logs
//! ```

use anyhow::Context;
use clap::Parser;
use podstudio_api::{build_app, ApiMetrics, AppState, ServerConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "podstudio-server", version, about = "Podstudio REST API server")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "PODSTUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Disable the /metrics endpoint
    #[arg(long)]
    no_metrics: bool,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if self.json_logs {
            config.json_logs = true;
        }
        if self.no_metrics {
            config.metrics_enabled = false;
        }
        if self.no_cors {
            config.cors_enabled = false;
        }
    }
}

fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_tracing(&config)?;

    let metrics = Arc::new(ApiMetrics::new().context("failed to register metrics")?);
    let state = AppState::new(Arc::new(Store::new()), metrics)
        .context("form catalog is miswired")?
        .with_metrics_enabled(config.metrics_enabled);
    let app = build_app(state, &config);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        cors = config.cors_enabled,
        metrics = config.metrics_enabled,
        "Podstudio API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
