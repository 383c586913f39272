//! Events broadcast to subscribers via tokio::broadcast — detector updates and
//! journal changes.

use serde::{Deserialize, Serialize};

use crate::types::{DailyRecord, DetectorStatus};

/// Events broadcast from a live detector to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DetectorEvent {
    /// Lifecycle state changed
    #[serde(rename = "status")]
    Status(DetectorStatus),

    /// A stabilized expression label passed the emission gate
    #[serde(rename = "emotion")]
    Emotion(String),

    /// Label captured by a shot (None if nothing was surfaced yet)
    #[serde(rename = "shot")]
    Shot(Option<String>),

    /// User-facing failure message (camera or model)
    #[serde(rename = "error")]
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub user: String,
    pub date: String,
    pub record: DailyRecord,
}

/// Events broadcast from the journal store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum JournalEvent {
    #[serde(rename = "record")]
    RecordUpdated(RecordUpdate),
}

impl JournalEvent {
    /// Serialize to the JSON format the frontend expects:
    /// `{"event": "...", "data": {...}}`
    pub fn to_ws_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    pub fn user(&self) -> &str {
        match self {
            JournalEvent::RecordUpdated(u) => &u.user,
        }
    }
}
