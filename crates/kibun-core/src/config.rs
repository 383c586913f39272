//! Configuration — YAML config + env var overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key (set here or via OPENWEATHER_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// City query, e.g. "Fukuoka,jp"
    #[serde(default = "default_city")]
    pub city: String,

    /// "metric" gives °C
    #[serde(default = "default_units")]
    pub units: String,

    /// Language of the weather description
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where per-user journal documents live (relative paths resolve against
    /// the config file's directory)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// HTTP port for kibun-web
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub weather: WeatherConfig,

    /// Base URL of the expression analysis service used for snapshot capture
    #[serde(default)]
    pub analyzer_url: Option<String>,

    /// Resolved project root (set at load time, not serialized from YAML)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_port() -> u16 {
    8000
}
fn default_city() -> String {
    "Fukuoka,jp".into()
}
fn default_units() -> String {
    "metric".into()
}
fn default_lang() -> String {
    "ja".into()
}
fn default_weather_base_url() -> String {
    OPENWEATHER_BASE_URL.into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            city: default_city(),
            units: default_units(),
            lang: default_lang(),
            base_url: default_weather_base_url(),
        }
    }
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        config.project_root = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf()
            .canonicalize()
            .unwrap_or_else(|_| {
                config_path
                    .parent()
                    .unwrap_or(Path::new("."))
                    .to_path_buf()
            });

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults + env overrides, for running without a config file.
    pub fn from_env(project_root: &Path) -> Result<Self> {
        let mut config = Config {
            project_root: project_root.to_path_buf(),
            ..Default::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("KIBUN_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("KIBUN_ANALYZER_URL") {
            self.analyzer_url = Some(url);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be non-zero");
        }
        if let Some(url) = &self.analyzer_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("analyzer_url must be an http(s) URL, got '{}'", url);
            }
        }
        Ok(())
    }

    /// Absolute data directory.
    pub fn data_path(&self) -> PathBuf {
        let p = Path::new(&self.data_dir);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            port: default_port(),
            weather: WeatherConfig::default(),
            analyzer_url: None,
            project_root: PathBuf::new(),
        }
    }
}
