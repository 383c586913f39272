//! JSON error responses for the REST API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use kibun_core::record::RecordError;
use kibun_core::store::StoreError;
use kibun_core::weather::WeatherError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// A collaborator is not configured
    Unavailable(String),
    /// A collaborator failed
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Upstream(m) => {
                warn!("Upstream failure: {}", m);
                (StatusCode::BAD_GATEWAY, m)
            }
            ApiError::Internal(m) => {
                error!("Internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidUser(_) | StoreError::Record(_) => {
                ApiError::BadRequest(e.to_string())
            }
            StoreError::Io(_) | StoreError::Encode(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::MissingApiKey => ApiError::Unavailable(e.user_message().to_string()),
            _ => {
                warn!("Weather fetch failed: {}", e);
                ApiError::Upstream(e.user_message().to_string())
            }
        }
    }
}
