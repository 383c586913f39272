//! Web server — Axum router + shared state.

pub mod api;
pub mod error;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use kibun_core::config::Config;
use kibun_core::detector::remote::RemoteExpressionModel;
use kibun_core::journal::Journal;
use kibun_core::store::JournalStore;
use kibun_core::weather::WeatherClient;

/// Shared application state.
pub struct AppState {
    pub journal: Journal,
    /// Snapshot analyser; capture is disabled when no `analyzer_url` is set
    pub analyzer: Option<RemoteExpressionModel>,
    pub project_root: PathBuf,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let data_dir = config.data_path();
        let store = JournalStore::open(&data_dir)
            .with_context(|| format!("Failed to open journal at {}", data_dir.display()))?;
        let weather =
            WeatherClient::new(config.weather.clone()).context("Failed to build weather client")?;

        let analyzer = match &config.analyzer_url {
            Some(url) => {
                info!("Expression analysis via {}", url);
                Some(RemoteExpressionModel::new(url)?)
            }
            None => None,
        };

        Ok(Self {
            journal: Journal::new(Arc::new(store), Arc::new(weather)),
            analyzer,
            project_root: config.project_root.clone(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::very_permissive();

    let mut app = Router::new()
        .merge(api::routes())
        .merge(ws::routes())
        .layer(cors)
        .with_state(state.clone());

    // Serve frontend static files if dist directory exists
    let frontend_dist = state.project_root.join("frontend/dist");
    if frontend_dist.is_dir() {
        let index_html = frontend_dist.join("index.html");
        app = app.fallback_service(
            ServeDir::new(&frontend_dist).not_found_service(ServeFile::new(index_html)),
        );
    }

    app
}
