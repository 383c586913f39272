//! Day-record validation — untyped JSON payloads become typed patches here,
//! before anything reaches the store or the advice engine.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::mood::{SLIDER_MAX, SLIDER_MIN};
use crate::types::{DailyRecord, UserDocument, WeatherSnapshot};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> RecordError {
    RecordError::InvalidField {
        field,
        reason: reason.into(),
    }
}

// ── Date keys ──

/// A `YYYY-MM-DD` key naming one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Strict parse: four-digit year, two-digit month and day, a real date.
    pub fn parse(s: &str) -> Result<Self, RecordError> {
        let b = s.as_bytes();
        let shaped = b.len() == 10
            && b[4] == b'-'
            && b[7] == b'-'
            && b
                .iter()
                .enumerate()
                .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
        if !shaped {
            return Err(RecordError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateKey)
            .map_err(|_| RecordError::InvalidDate(s.to_string()))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DateKey(date)
    }

    /// Today in local time.
    pub fn today() -> Self {
        DateKey(chrono::Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ── Field readers ──

fn read_slider(value: &Value) -> Result<f64, RecordError> {
    let v = value
        .as_f64()
        .ok_or_else(|| invalid("slider_value", "expected a number"))?;
    if !(SLIDER_MIN..=SLIDER_MAX).contains(&v) {
        return Err(invalid(
            "slider_value",
            format!("{} is outside {}..={}", v, SLIDER_MIN, SLIDER_MAX),
        ));
    }
    Ok(v)
}

fn read_string(field: &'static str, value: &Value) -> Result<String, RecordError> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| invalid(field, "expected a string"))
}

fn read_tags(field: &'static str, value: &Value) -> Result<Vec<String>, RecordError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(field, "expected a list of strings"))?;
    items
        .iter()
        .map(|t| {
            t.as_str()
                .map(String::from)
                .ok_or_else(|| invalid(field, "expected a list of strings"))
        })
        .collect()
}

fn read_weather(value: &Value) -> Result<WeatherSnapshot, RecordError> {
    if !value.is_object() {
        return Err(invalid("weather", "expected an object"));
    }
    serde_json::from_value(value.clone()).map_err(|e| invalid("weather", e.to_string()))
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, RecordError> {
    value.as_object().ok_or(RecordError::NotAnObject)
}

// ── Day-record patch ──

/// Partial update of one day record. Absent fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyRecordPatch {
    pub slider_value: Option<f64>,
    pub selected_tags: Option<Vec<String>>,
    pub memo: Option<String>,
    pub circle_color: Option<String>,
    pub emotion: Option<String>,
    pub weather: Option<WeatherSnapshot>,
}

impl DailyRecordPatch {
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let mut patch = Self::default();
        for (key, v) in as_object(value)? {
            match key.as_str() {
                "slider_value" => patch.slider_value = Some(read_slider(v)?),
                "selected_tags" => patch.selected_tags = Some(read_tags("selected_tags", v)?),
                "memo" => patch.memo = Some(read_string("memo", v)?),
                "circle_color" => patch.circle_color = Some(read_string("circle_color", v)?),
                "emotion" => patch.emotion = Some(read_string("emotion", v)?),
                "weather" => patch.weather = Some(read_weather(v)?),
                other => return Err(RecordError::UnknownField(other.to_string())),
            }
        }
        Ok(patch)
    }

    pub fn emotion(label: impl Into<String>) -> Self {
        Self {
            emotion: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy every present field onto `record`.
    pub fn apply(self, record: &mut DailyRecord) {
        if let Some(v) = self.slider_value {
            record.slider_value = Some(v);
        }
        if let Some(v) = self.selected_tags {
            record.selected_tags = Some(v);
        }
        if let Some(v) = self.memo {
            record.memo = Some(v);
        }
        if let Some(v) = self.circle_color {
            record.circle_color = Some(v);
        }
        if let Some(v) = self.emotion {
            record.emotion = Some(v);
        }
        if let Some(v) = self.weather {
            record.weather = Some(v);
        }
    }
}

// ── Draft patch ──

/// Partial update of the top-level draft fields of a user document.
/// `tag1`/`tag2` accept `null` to clear the tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPatch {
    pub slider_value: Option<f64>,
    pub circle_color: Option<String>,
    pub selected_tags: Option<Vec<String>>,
    pub memo: Option<String>,
    pub tag1: Option<Option<String>>,
    pub tag2: Option<Option<String>>,
}

impl DraftPatch {
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let mut patch = Self::default();
        for (key, v) in as_object(value)? {
            match key.as_str() {
                "slider_value" => patch.slider_value = Some(read_slider(v)?),
                "circle_color" => patch.circle_color = Some(read_string("circle_color", v)?),
                "selected_tags" => patch.selected_tags = Some(read_tags("selected_tags", v)?),
                "memo" => patch.memo = Some(read_string("memo", v)?),
                "tag1" if v.is_null() => patch.tag1 = Some(None),
                "tag1" => patch.tag1 = Some(Some(read_string("tag1", v)?)),
                "tag2" if v.is_null() => patch.tag2 = Some(None),
                "tag2" => patch.tag2 = Some(Some(read_string("tag2", v)?)),
                other => return Err(RecordError::UnknownField(other.to_string())),
            }
        }
        Ok(patch)
    }

    pub fn apply(self, doc: &mut UserDocument) {
        if let Some(v) = self.slider_value {
            doc.slider_value = v;
        }
        if let Some(v) = self.circle_color {
            doc.circle_color = v;
        }
        if let Some(v) = self.selected_tags {
            doc.selected_tags = v;
        }
        if let Some(v) = self.memo {
            doc.memo = v;
        }
        if let Some(v) = self.tag1 {
            doc.tag1 = v;
        }
        if let Some(v) = self.tag2 {
            doc.tag2 = v;
        }
    }
}
