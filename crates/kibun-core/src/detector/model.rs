//! Inference capability — the face/expression model the detector drives, and the
//! drawing surface overlays go to.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{BoundingBox, Detection, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GPU / hardware-accelerated execution
    Accelerated,
    /// Portable reference implementation
    Reference,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Accelerated => write!(f, "accelerated"),
            Backend::Reference => write!(f, "reference"),
        }
    }
}

#[async_trait]
pub trait ExpressionModel: Send + Sync {
    /// Switch execution backend. Fails if the backend is not available here.
    async fn select_backend(&self, backend: Backend) -> Result<()>;

    /// Load network weights. Called once, after a backend was selected.
    async fn load_weights(&self) -> Result<()>;

    /// Detect faces and score expressions in one frame, resized to
    /// `input_size`×`input_size` for the network.
    async fn detect(&self, frame: &Frame, input_size: u32) -> Result<Vec<Detection>>;
}

/// Where detection overlays are drawn.
pub trait Surface: Send {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn draw_box(&mut self, bbox: &BoundingBox);
}

/// Select a backend (accelerated first) and load weights.
pub async fn prepare(model: &dyn ExpressionModel) -> Result<Backend> {
    let backend = match model.select_backend(Backend::Accelerated).await {
        Ok(()) => Backend::Accelerated,
        Err(e) => {
            warn!("Accelerated backend unavailable, falling back: {:#}", e);
            model
                .select_backend(Backend::Reference)
                .await
                .context("no usable inference backend")?;
            Backend::Reference
        }
    };

    model
        .load_weights()
        .await
        .context("failed to load expression model weights")?;

    info!("Expression model loaded on {} backend", backend);
    Ok(backend)
}
