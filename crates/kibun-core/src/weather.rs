//! Weather — current conditions from OpenWeather for the configured city.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::types::WeatherSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("OpenWeather API key is not configured")]
    MissingApiKey,
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },
}

impl WeatherError {
    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        "天気情報の取得に失敗しました"
    }
}

/// Current weather as shown to the user and folded into day records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Localized description, e.g. "晴天"
    pub description: String,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    /// Main category, e.g. "Rain"
    pub condition: String,
}

impl WeatherReport {
    pub fn icon(&self) -> &'static str {
        let d = self.description.as_str();
        if d.contains('晴') {
            "☀️"
        } else if d.contains('曇') {
            "☁️"
        } else if d.contains('雨') {
            "🌧️"
        } else if d.contains('雪') {
            "❄️"
        } else {
            "🌈"
        }
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: self.temperature,
            pressure: self.pressure,
            condition: self.condition.clone(),
        }
    }
}

impl From<WeatherReport> for WeatherSnapshot {
    fn from(report: WeatherReport) -> Self {
        WeatherSnapshot {
            temperature: report.temperature,
            pressure: report.pressure,
            condition: report.condition,
        }
    }
}

/// Pull the fields we use out of an OpenWeather "current weather" payload.
/// Anything missing is left empty rather than failing.
pub fn parse_openweather(data: &Value) -> WeatherReport {
    let main = &data["main"];
    let first = &data["weather"][0];
    WeatherReport {
        description: first["description"].as_str().unwrap_or_default().to_string(),
        temperature: main["temp"].as_f64(),
        pressure: main["pressure"].as_f64(),
        humidity: main["humidity"].as_f64(),
        condition: first["main"].as_str().unwrap_or_default().to_string(),
    }
}

pub struct WeatherClient {
    config: WeatherConfig,
    client: reqwest::Client,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub async fn current(&self) -> Result<WeatherReport, WeatherError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(WeatherError::MissingApiKey)?;

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", self.config.city.as_str()),
                ("appid", api_key),
                ("units", self.config.units.as_str()),
                ("lang", self.config.lang.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(200).collect();
            warn!("Weather request failed: HTTP {} — {}", status, message);
            return Err(WeatherError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let data: Value = response.json().await?;
        let report = parse_openweather(&data);
        debug!(
            "Weather for {}: {} {:?}°C",
            self.config.city, report.condition, report.temperature
        );
        Ok(report)
    }
}
