//! Core types — mood/emotion buckets, weather, advice input, detections, day records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Mood / emotion buckets ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLevel {
    Low,
    Mid,
    High,
}

impl std::fmt::Display for MoodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodLevel::Low => write!(f, "low"),
            MoodLevel::Mid => write!(f, "mid"),
            MoodLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTone {
    Negative,
    Neutral,
    Positive,
    Unknown,
}

impl std::fmt::Display for EmotionTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmotionTone::Negative => write!(f, "negative"),
            EmotionTone::Neutral => write!(f, "neutral"),
            EmotionTone::Positive => write!(f, "positive"),
            EmotionTone::Unknown => write!(f, "unknown"),
        }
    }
}

// ── Weather ──

/// Ambient weather as consumed by the advice engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Degrees Celsius
    #[serde(default)]
    pub temperature: Option<f64>,
    /// hPa
    #[serde(default)]
    pub pressure: Option<f64>,
    /// OpenWeather main category, e.g. "Rain" or "Clear"
    #[serde(default)]
    pub condition: String,
}

// ── Advice ──

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceInput {
    pub mood_raw: String,
    pub activity_tags: Vec<String>,
    pub emotion_raw: Option<String>,
    pub memo: String,
    pub weather: WeatherSnapshot,
}

// ── Detection ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionScore {
    pub label: String,
    pub score: f32,
}

/// One inference result for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    /// Scores in the order the model reported them.
    pub expressions: Vec<ExpressionScore>,
}

impl Detection {
    /// Highest-scoring expression. On equal scores the earlier entry wins, so the
    /// result depends on the order the model listed its labels in.
    pub fn dominant(&self) -> Option<&ExpressionScore> {
        let mut best: Option<&ExpressionScore> = None;
        for expr in &self.expressions {
            match best {
                Some(b) if expr.score <= b.score => {}
                _ => best = Some(expr),
            }
        }
        best
    }
}

/// A decoded video frame. `data` is opaque to the detector; models interpret it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn is_decoded(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

// ── Detector status ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStatus {
    Uninitialized,
    LoadingModel,
    Idle,
    Active,
    Failed,
}

impl std::fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorStatus::Uninitialized => write!(f, "uninitialized"),
            DetectorStatus::LoadingModel => write!(f, "loading_model"),
            DetectorStatus::Idle => write!(f, "idle"),
            DetectorStatus::Active => write!(f, "active"),
            DetectorStatus::Failed => write!(f, "failed"),
        }
    }
}

// ── Day records ──

/// Everything logged for one calendar day. All fields are optional because the
/// record is assembled from several partial writes over the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisEntry {
    pub date: String,
    pub result: String,
}

/// Per-user document: in-progress draft fields plus all day records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub slider_value: f64,
    pub circle_color: String,
    #[serde(default)]
    pub selected_tags: Vec<String>,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub tag1: Option<String>,
    #[serde(default)]
    pub tag2: Option<String>,
    #[serde(default)]
    pub daily_records: BTreeMap<String, DailyRecord>,
    #[serde(default)]
    pub diagnosis_mental: Vec<DiagnosisEntry>,
    #[serde(default)]
    pub diagnosis_action: Vec<DiagnosisEntry>,
}

impl Default for UserDocument {
    fn default() -> Self {
        Self {
            slider_value: crate::mood::DEFAULT_SLIDER,
            circle_color: crate::mood::DEFAULT_COLOR.to_string(),
            selected_tags: Vec::new(),
            memo: String::new(),
            tag1: None,
            tag2: None,
            daily_records: BTreeMap::new(),
            diagnosis_mental: Vec::new(),
            diagnosis_action: Vec::new(),
        }
    }
}
