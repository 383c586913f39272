//! Remote expression model — frames are posted as JPEG to an analysis service.
//!
//! Wire format of `POST {base}/analyze`:
//! `{"status": "success", "detections": [{"box": {...}, "expressions": [{"label", "score"}]}]}`
//! or `{"status": "error", "message": "..."}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::model::{Backend, ExpressionModel};
use crate::types::{Detection, Frame};

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    status: String,
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    message: Option<String>,
}

pub struct RemoteExpressionModel {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteExpressionModel {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("kibun/0.1 (expression)")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// Parse an analysis response body.
pub fn parse_analysis(body: &str) -> Result<Vec<Detection>> {
    let resp: AnalyzeResponse =
        serde_json::from_str(body).context("invalid analysis response")?;
    if resp.status != "success" {
        anyhow::bail!(
            "analysis failed: {}",
            resp.message.unwrap_or_else(|| resp.status.clone())
        );
    }
    Ok(resp.detections)
}

#[async_trait]
impl ExpressionModel for RemoteExpressionModel {
    async fn select_backend(&self, _backend: Backend) -> Result<()> {
        // The service picks its own hardware.
        Ok(())
    }

    async fn load_weights(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("analysis service unreachable at {}", url))?;
        if !resp.status().is_success() {
            anyhow::bail!("analysis service not ready: HTTP {}", resp.status());
        }
        Ok(())
    }

    async fn detect(&self, frame: &Frame, input_size: u32) -> Result<Vec<Detection>> {
        let part = reqwest::multipart::Part::bytes(frame.data.clone())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("width", frame.width.to_string())
            .text("height", frame.height.to_string())
            .text("input_size", input_size.to_string());

        let resp = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("analysis request failed")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("analysis service error: HTTP {}", status);
        }
        parse_analysis(&body)
    }
}
