//! REST API endpoints. Every route acts on the user named by `?user=ID`
//! (default `local`).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use kibun_core::calendar;
use kibun_core::detector::gate::SCORE_THRESHOLD;
use kibun_core::detector::model::ExpressionModel;
use kibun_core::detector::INPUT_SIZE;
use kibun_core::diagnosis::DiagnosisKind;
use kibun_core::mood::{circle_color, mood_label, DEFAULT_COLOR, DEFAULT_SLIDER};
use kibun_core::record::{DailyRecordPatch, DateKey, DraftPatch};
use kibun_core::types::{Detection, Frame};

use super::error::ApiError;
use super::AppState;

pub const DEFAULT_USER: &str = "local";

type ApiResult = Result<Json<Value>, ApiError>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/records", get(list_records))
        .route("/api/records/{date}", get(get_record).post(post_record))
        .route("/api/draft", post(post_draft))
        .route("/api/today", get(get_today))
        .route("/api/advice", get(get_advice))
        .route("/api/weather", get(get_weather))
        .route("/api/capture", post(post_capture))
        .route(
            "/api/diagnosis/{kind}",
            get(get_diagnosis).post(post_diagnosis),
        )
        .route("/api/calendar", get(get_calendar))
}

#[derive(Deserialize)]
struct UserQuery {
    user: Option<String>,
}

#[derive(Deserialize)]
struct DateQuery {
    user: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct MonthQuery {
    user: Option<String>,
    month: Option<String>,
}

fn resolve_user(user: Option<String>) -> String {
    user.filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

/// `?date=` if given, else today.
fn resolve_date(date: Option<&str>) -> Result<DateKey, ApiError> {
    match date {
        Some(d) => Ok(DateKey::parse(d)?),
        None => Ok(DateKey::today()),
    }
}

// --- Day records ---

async fn list_records(State(state): State<Arc<AppState>>, Query(q): Query<UserQuery>) -> ApiResult {
    let user = resolve_user(q.user);
    let records = state.journal.store.records(&user).await?;
    Ok(Json(json!({ "user": user, "records": records })))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Query(q): Query<UserQuery>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let date = DateKey::parse(&date)?;
    let record = state.journal.store.record(&user, &date).await?;
    Ok(Json(json!({ "date": date.to_string(), "record": record })))
}

async fn post_record(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Query(q): Query<UserQuery>,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let date = DateKey::parse(&date)?;
    let mut patch = DailyRecordPatch::from_value(&body)?;
    if patch.circle_color.is_none() {
        patch.circle_color = patch.slider_value.map(circle_color);
    }

    let record = state.journal.store.merge_record(&user, &date, patch).await?;
    Ok(Json(json!({ "ok": true, "date": date.to_string(), "record": record })))
}

async fn post_draft(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let mut patch = DraftPatch::from_value(&body)?;
    if patch.circle_color.is_none() {
        patch.circle_color = patch.slider_value.map(circle_color);
    }
    let doc = state.journal.store.update_draft(&user, patch).await?;
    Ok(Json(json!({
        "ok": true,
        "slider_value": doc.slider_value,
        "circle_color": doc.circle_color,
        "selected_tags": doc.selected_tags,
        "memo": doc.memo,
        "tag1": doc.tag1,
        "tag2": doc.tag2,
    })))
}

// --- Today / advice ---

async fn get_today(State(state): State<Arc<AppState>>, Query(q): Query<UserQuery>) -> ApiResult {
    let user = resolve_user(q.user);
    let date = DateKey::today();
    let record = state
        .journal
        .store
        .record(&user, &date)
        .await?
        .unwrap_or_default();
    let advice = state.journal.advice_for(&user, &date).await?;

    Ok(Json(json!({
        "date": date.to_string(),
        "mood": mood_label(record.slider_value.unwrap_or(DEFAULT_SLIDER)),
        "circle_color": record.circle_color.as_deref().unwrap_or(DEFAULT_COLOR),
        "record": record,
        "advice": advice,
    })))
}

async fn get_advice(State(state): State<Arc<AppState>>, Query(q): Query<DateQuery>) -> ApiResult {
    let user = resolve_user(q.user);
    let date = resolve_date(q.date.as_deref())?;
    let advice = state.journal.advice_for(&user, &date).await?;
    Ok(Json(json!({ "date": date.to_string(), "advice": advice })))
}

// --- Weather ---

async fn get_weather(State(state): State<Arc<AppState>>) -> ApiResult {
    let report = state.journal.current_weather().await?;
    Ok(Json(json!({
        "description": report.description,
        "temp": report.temperature,
        "pressure": report.pressure,
        "humidity": report.humidity,
        "condition": report.condition,
        "icon": report.icon(),
    })))
}

// --- Snapshot capture ---

#[derive(Deserialize)]
struct CaptureBody {
    /// JPEG as a `data:image/jpeg;base64,...` URL or bare base64
    image: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

fn decode_image(image: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match image.split_once(',') {
        Some((head, data)) if head.starts_with("data:") => {
            if !head.ends_with(";base64") {
                return Err(ApiError::BadRequest("image must be base64-encoded".into()));
            }
            data
        }
        _ => image,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("invalid image data: {}", e)))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("empty image".into()));
    }
    Ok(bytes)
}

async fn post_capture(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
    Json(body): Json<CaptureBody>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let date = resolve_date(q.date.as_deref())?;
    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("expression analysis is not configured".into()))?;

    let frame = Frame {
        width: body.width,
        height: body.height,
        data: decode_image(&body.image)?,
    };
    let detections = analyzer
        .detect(&frame, INPUT_SIZE)
        .await
        .map_err(|e| ApiError::Upstream(format!("{:#}", e)))?;

    let top = detections.first().and_then(Detection::dominant).cloned();
    debug!("Capture for {}: {} face(s), top {:?}", user, detections.len(), top);

    let accepted = top.filter(|s| s.score >= SCORE_THRESHOLD);
    let emotion = match &accepted {
        Some(score) => {
            state
                .journal
                .record_emotion(&user, &date, &score.label)
                .await?;
            info!("Captured emotion {} for {} on {}", score.label, user, date);
            Some(score.label.clone())
        }
        None => None,
    };

    Ok(Json(json!({
        "date": date.to_string(),
        "faces": detections.len(),
        "emotion": emotion,
        "score": accepted.map(|s| s.score),
    })))
}

// --- Self-check questionnaires ---

fn parse_kind(kind: &str) -> Result<DiagnosisKind, ApiError> {
    DiagnosisKind::parse(kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown questionnaire '{}'", kind)))
}

async fn get_diagnosis(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(q): Query<UserQuery>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let kind = parse_kind(&kind)?;
    let history = state.journal.store.diagnosis_history(&user, kind).await?;
    Ok(Json(json!({
        "kind": kind,
        "title": kind.title(),
        "questions": kind.questions(),
        "history": history,
    })))
}

#[derive(Deserialize)]
struct DiagnosisBody {
    /// Number of ticked items
    checked: Option<usize>,
    /// One answer per question, as an alternative to `checked`
    answers: Option<Vec<bool>>,
}

async fn post_diagnosis(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(q): Query<UserQuery>,
    Json(body): Json<DiagnosisBody>,
) -> ApiResult {
    let user = resolve_user(q.user);
    let kind = parse_kind(&kind)?;
    let total = kind.questions().len();

    let checked = match (body.checked, body.answers) {
        (Some(n), _) => n,
        (None, Some(answers)) => {
            if answers.len() != total {
                return Err(ApiError::BadRequest(format!(
                    "expected {} answers, got {}",
                    total,
                    answers.len()
                )));
            }
            answers.iter().filter(|a| **a).count()
        }
        (None, None) => {
            return Err(ApiError::BadRequest("`checked` or `answers` is required".into()))
        }
    };
    if checked > total {
        return Err(ApiError::BadRequest(format!(
            "checked must be at most {}",
            total
        )));
    }

    let entry = state
        .journal
        .store
        .record_diagnosis(&user, kind, checked)
        .await?;
    let history = state.journal.store.diagnosis_history(&user, kind).await?;
    Ok(Json(json!({ "result": entry.result, "entry": entry, "history": history })))
}

// --- Calendar ---

async fn get_calendar(State(state): State<Arc<AppState>>, Query(q): Query<MonthQuery>) -> ApiResult {
    let user = resolve_user(q.user);
    let month = q
        .month
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m").to_string());
    let (year, m) =
        calendar::parse_month(&month).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let records = state.journal.store.records(&user).await?;
    let weeks = calendar::month_grid(year, m, &records)
        .ok_or_else(|| ApiError::BadRequest(format!("month out of range: {}", month)))?;
    Ok(Json(json!({ "month": month, "weeks": weeks })))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use kibun_core::config::Config;

    use crate::server::router;

    fn app(dir: &std::path::Path) -> Router {
        let config = Config {
            data_dir: dir.join("data").to_string_lossy().into_owned(),
            project_root: dir.to_path_buf(),
            ..Default::default()
        };
        router(Arc::new(AppState::new(&config).unwrap()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(v.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_record_roundtrip_and_merge() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(
            &app,
            "POST",
            "/api/records/2025-06-01?user=u1",
            Some(json!({"slider_value": 2, "memo": "朝"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["circle_color"], "rgb(190, 201, 240)");

        call(
            &app,
            "POST",
            "/api/records/2025-06-01?user=u1",
            Some(json!({"emotion": "happy"})),
        )
        .await;

        let (status, body) = call(&app, "GET", "/api/records/2025-06-01?user=u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["memo"], "朝");
        assert_eq!(body["record"]["emotion"], "happy");

        // Other users and the default user see nothing
        let (_, body) = call(&app, "GET", "/api/records", None).await;
        assert_eq!(body["user"], "local");
        assert_eq!(body["records"], json!({}));
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(&app, "GET", "/api/records/2025-6-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));

        let (status, _) = call(
            &app,
            "POST",
            "/api/records/2025-06-01",
            Some(json!({"slider_value": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            "/api/records/2025-06-01",
            Some(json!({"unknown": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/api/records?user=..%2Fetc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_advice_for_empty_day() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(&app, "GET", "/api/advice?date=2025-06-01", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["advice"], "今日は落ち着いた1日になりそうです。");
    }

    #[tokio::test]
    async fn test_today() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(&app, "GET", "/api/today", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mood"], "普通");
        assert_eq!(body["circle_color"], DEFAULT_COLOR);
        assert_eq!(body["date"], DateKey::today().to_string());
    }

    #[tokio::test]
    async fn test_unconfigured_collaborators() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(&app, "GET", "/api/weather", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());

        let (status, _) = call(
            &app,
            "POST",
            "/api/capture?date=2025-06-01",
            Some(json!({"image": "data:image/jpeg;base64,/9j/4AAQ"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_decode_image() {
        assert_eq!(decode_image("data:image/jpeg;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_image("AQID").unwrap(), vec![1, 2, 3]);
        assert!(decode_image("data:image/jpeg,raw").is_err());
        assert!(decode_image("data:image/jpeg;base64,!!!").is_err());
        assert!(decode_image("").is_err());
    }

    #[tokio::test]
    async fn test_diagnosis_flow() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(&app, "GET", "/api/diagnosis/action", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 20);
        assert_eq!(body["history"], json!([]));

        for checked in [1, 8, 14] {
            let (status, _) = call(
                &app,
                "POST",
                "/api/diagnosis/action",
                Some(json!({ "checked": checked })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let mut answers = vec![false; 20];
        answers[0] = true;
        let (_, body) = call(
            &app,
            "POST",
            "/api/diagnosis/action",
            Some(json!({ "answers": answers })),
        )
        .await;
        assert!(body["result"].as_str().unwrap().starts_with("小さな疲れ"));
        assert_eq!(body["history"].as_array().unwrap().len(), 2);

        let (status, _) = call(
            &app,
            "POST",
            "/api/diagnosis/action",
            Some(json!({ "checked": 21 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/api/diagnosis/sleep", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_calendar() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        call(
            &app,
            "POST",
            "/api/records/2025-06-10",
            Some(json!({"slider_value": 5})),
        )
        .await;

        let (status, body) = call(&app, "GET", "/api/calendar?month=2025-06", None).await;
        assert_eq!(status, StatusCode::OK);
        let weeks = body["weeks"].as_array().unwrap();
        assert_eq!(weeks.len(), 5);
        // 2025-06-10 is the Tuesday of the second week
        assert_eq!(weeks[1][2]["date"], "2025-06-10");
        assert_eq!(weeks[1][2]["color"], "rgb(247, 119, 166)");
        assert_eq!(weeks[0][0]["day_kind"], "sunday");

        let (status, _) = call(&app, "GET", "/api/calendar?month=2025-13", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_draft() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());

        let (status, body) = call(
            &app,
            "POST",
            "/api/draft?user=u1",
            Some(json!({"slider_value": 1, "tag1": "仕事"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["circle_color"], "rgb(138, 159, 238)");
        assert_eq!(body["tag1"], "仕事");
        assert_eq!(body["memo"], "");
    }
}
