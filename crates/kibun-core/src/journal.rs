//! Journal — the context handlers work against: the record store plus the
//! weather client, and the glue that feeds records into the advice engine
//! and detector shots into records.

use std::sync::Arc;

use tracing::{info, warn};

use crate::advice::generate_advice;
use crate::detector::LiveDetector;
use crate::mood::{mood_label, DEFAULT_SLIDER};
use crate::record::{DailyRecordPatch, DateKey};
use crate::store::{JournalStore, StoreError};
use crate::types::{AdviceInput, DailyRecord, WeatherSnapshot};
use crate::weather::{WeatherClient, WeatherError, WeatherReport};

/// Build the advice input for a stored day record. Missing slider reads as the
/// neutral default; missing weather as "unknown".
pub fn advice_input(record: &DailyRecord) -> AdviceInput {
    AdviceInput {
        mood_raw: mood_label(record.slider_value.unwrap_or(DEFAULT_SLIDER)).to_string(),
        activity_tags: record.selected_tags.clone().unwrap_or_default(),
        emotion_raw: record.emotion.clone(),
        memo: record.memo.clone().unwrap_or_default(),
        weather: record.weather.clone().unwrap_or_default(),
    }
}

pub struct Journal {
    pub store: Arc<JournalStore>,
    pub weather: Arc<WeatherClient>,
}

impl Journal {
    pub fn new(store: Arc<JournalStore>, weather: Arc<WeatherClient>) -> Self {
        Self { store, weather }
    }

    pub async fn advice_for(&self, user: &str, date: &DateKey) -> Result<String, StoreError> {
        let record = self.store.record(user, date).await?.unwrap_or_default();
        Ok(generate_advice(&advice_input(&record)))
    }

    pub async fn record_emotion(
        &self,
        user: &str,
        date: &DateKey,
        label: &str,
    ) -> Result<DailyRecord, StoreError> {
        self.store
            .merge_record(user, date, DailyRecordPatch::emotion(label))
            .await
    }

    /// Take a shot from `detector` and, if a label had been surfaced, store it
    /// as the day's emotion.
    pub async fn capture_shot(
        &self,
        detector: &LiveDetector,
        user: &str,
        date: &DateKey,
        stop_after: bool,
    ) -> Result<Option<String>, StoreError> {
        let label = detector.shot(stop_after).await;
        match &label {
            Some(l) => {
                self.record_emotion(user, date, l).await?;
                info!("Shot {} stored for {} on {}", l, user, date);
            }
            None => info!("Shot taken before any expression was detected"),
        }
        Ok(label)
    }

    pub async fn current_weather(&self) -> Result<WeatherReport, WeatherError> {
        self.weather.current().await
    }

    /// Fetch the current weather and attach it to the day record. Weather
    /// failures are logged and leave the record untouched.
    pub async fn attach_weather(
        &self,
        user: &str,
        date: &DateKey,
    ) -> Result<Option<WeatherSnapshot>, StoreError> {
        let report = match self.weather.current().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Weather unavailable: {}", e);
                return Ok(None);
            }
        };
        let snapshot = report.snapshot();
        let patch = DailyRecordPatch {
            weather: Some(snapshot.clone()),
            ..Default::default()
        };
        self.store.merge_record(user, date, patch).await?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::advice::DEFAULT_ADVICE;
    use crate::config::WeatherConfig;
    use crate::detector::camera::{
        Camera, CameraConstraints, CameraDevice, CameraError, VideoStream,
    };
    use crate::detector::model::{Backend, ExpressionModel, Surface};
    use crate::types::{BoundingBox, Detection, ExpressionScore, Frame};

    fn journal(dir: &std::path::Path) -> Journal {
        Journal::new(
            Arc::new(JournalStore::open(dir).unwrap()),
            Arc::new(WeatherClient::new(WeatherConfig::default()).unwrap()),
        )
    }

    fn day() -> DateKey {
        DateKey::parse("2025-06-01").unwrap()
    }

    #[test]
    fn test_advice_input_defaults() {
        let input = advice_input(&DailyRecord::default());
        assert_eq!(input.mood_raw, "普通");
        assert!(input.activity_tags.is_empty());
        assert_eq!(input.emotion_raw, None);
        assert_eq!(input.weather, WeatherSnapshot::default());
    }

    #[tokio::test]
    async fn test_advice_from_stored_record() {
        let tmp = tempfile::tempdir().unwrap();
        let j = journal(tmp.path());

        let patch = DailyRecordPatch::from_value(&json!({
            "slider_value": 1.2,
            "selected_tags": ["#睡眠"],
            "weather": {"temperature": 20.0, "pressure": 1000.0, "condition": "Rain"}
        }))
        .unwrap();
        j.store.merge_record("u1", &day(), patch).await.unwrap();
        j.record_emotion("u1", &day(), "happy").await.unwrap();

        // low mood + positive face is a mismatch attributed to the weather
        let advice = j.advice_for("u1", &day()).await.unwrap();
        assert!(advice.starts_with("表情は明るいのに"));
        assert!(advice.ends_with("天候の影響で気分が落ちているだけかもしれません。"));
        assert!(!advice.contains("睡眠"));
        assert!(!advice.contains(DEFAULT_ADVICE));
    }

    #[tokio::test]
    async fn test_weather_failure_leaves_record_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let j = journal(tmp.path());
        assert_eq!(j.attach_weather("u1", &day()).await.unwrap(), None);
        assert!(j.store.record("u1", &day()).await.unwrap().is_none());
    }

    // ── Shot capture through a running detector ──

    struct OneFace;

    #[async_trait]
    impl ExpressionModel for OneFace {
        async fn select_backend(&self, _backend: Backend) -> anyhow::Result<()> {
            Ok(())
        }
        async fn load_weights(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn detect(&self, _frame: &Frame, _size: u32) -> anyhow::Result<Vec<Detection>> {
            Ok(vec![Detection {
                bounding_box: BoundingBox::default(),
                expressions: vec![ExpressionScore {
                    label: "surprised".into(),
                    score: 0.9,
                }],
            }])
        }
    }

    struct StillStream;

    impl VideoStream for StillStream {
        fn current_frame(&self) -> Option<Frame> {
            Some(Frame {
                width: 320,
                height: 240,
                data: Vec::new(),
            })
        }
        fn stop_tracks(&mut self) {}
    }

    struct StillCamera;

    #[async_trait]
    impl Camera for StillCamera {
        async fn acquire(
            &self,
            _constraints: &CameraConstraints,
        ) -> Result<Box<dyn VideoStream>, CameraError> {
            Ok(Box::new(StillStream))
        }

        async fn devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
            Ok(Vec::new())
        }
    }

    struct NullSurface(Mutex<(u32, u32)>);

    impl Surface for NullSurface {
        fn size(&self) -> (u32, u32) {
            *self.0.lock().unwrap()
        }
        fn resize(&mut self, width: u32, height: u32) {
            *self.0.lock().unwrap() = (width, height);
        }
        fn clear(&mut self) {}
        fn draw_box(&mut self, _bbox: &BoundingBox) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_shot_stores_emotion() {
        let tmp = tempfile::tempdir().unwrap();
        let j = journal(tmp.path());
        let detector = LiveDetector::new(
            Arc::new(OneFace),
            Arc::new(StillCamera),
            Box::new(NullSurface(Mutex::new((0, 0)))),
        );

        // Nothing surfaced yet
        assert_eq!(
            j.capture_shot(&detector, "u1", &day(), false).await.unwrap(),
            None
        );
        assert!(j.store.record("u1", &day()).await.unwrap().is_none());

        detector.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let label = j.capture_shot(&detector, "u1", &day(), true).await.unwrap();
        assert_eq!(label.as_deref(), Some("surprised"));

        let record = j.store.record("u1", &day()).await.unwrap().unwrap();
        assert_eq!(record.emotion.as_deref(), Some("surprised"));
    }
}
