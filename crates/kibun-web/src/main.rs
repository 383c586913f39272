//! kibun-web — Axum web server entry point.
//! Loads config, opens the journal store and serves the API.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use kibun_core::config::Config;

use server::AppState;

fn load_config(project_root: &std::path::Path) -> Result<Config> {
    let config_path = project_root.join("config.yaml");
    if !config_path.is_file() {
        info!("No config.yaml in {}, using defaults", project_root.display());
        return Config::from_env(project_root);
    }
    match Config::load(&config_path) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("Ignoring config.yaml: {:#}", e);
            Config::from_env(project_root)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&project_root)?;

    if config.weather.api_key.is_none() {
        warn!("OPENWEATHER_API_KEY not set, /api/weather will be unavailable");
    }

    let state = Arc::new(AppState::new(&config)?);
    let app = server::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    eprintln!("\n  kibun listening on http://localhost:{}\n", config.port);

    // Graceful shutdown on Ctrl+C
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}
