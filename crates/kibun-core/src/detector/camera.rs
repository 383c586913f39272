//! Camera capability — acquisition with constraint fallback, and the failure
//! reasons users need to tell apart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::types::Frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraConstraints {
    /// A specific device picked by the user
    Device(String),
    /// Front-facing camera
    FacingUser,
    /// Rear-facing camera
    FacingEnvironment,
    /// Whatever the platform hands out
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera matches the requested constraints")]
    NotFound,
    #[error("camera is busy")]
    Busy,
    #[error("camera failure: {0}")]
    Other(String),
}

impl CameraError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => {
                "カメラ起動に失敗しました（カメラ権限が拒否されています）".to_string()
            }
            CameraError::NotFound => {
                "カメラ起動に失敗しました（条件に合うカメラが見つかりません）".to_string()
            }
            CameraError::Busy => {
                "カメラ起動に失敗しました（他のアプリがカメラを使用中です）".to_string()
            }
            CameraError::Other(reason) => format!("カメラ起動に失敗しました: {}", reason),
        }
    }
}

/// A live media stream. Dropping it without `stop_tracks` leaks the device on
/// most platforms.
pub trait VideoStream: Send {
    /// Latest decoded frame, if any.
    fn current_frame(&self) -> Option<Frame>;

    /// Stop every track of the stream.
    fn stop_tracks(&mut self);
}

/// A video input the platform reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoStream>, CameraError>;

    /// Video inputs currently attached, in platform order.
    async fn devices(&self) -> Result<Vec<CameraDevice>, CameraError>;

    /// Fires whenever devices are plugged or unplugged. None if the platform
    /// does not report changes.
    fn device_changes(&self) -> Option<broadcast::Receiver<()>> {
        None
    }
}

/// Constraints to try, most specific first.
pub fn fallback_chain(selected_device: Option<&str>) -> Vec<CameraConstraints> {
    let mut chain = Vec::with_capacity(4);
    if let Some(id) = selected_device.filter(|id| !id.is_empty()) {
        chain.push(CameraConstraints::Device(id.to_string()));
    }
    chain.push(CameraConstraints::FacingUser);
    chain.push(CameraConstraints::FacingEnvironment);
    chain.push(CameraConstraints::Any);
    chain
}

/// Try each constraint in order. The error of the last attempt is returned if
/// none succeeds.
pub async fn acquire_with_fallback(
    camera: &dyn Camera,
    chain: &[CameraConstraints],
) -> Result<Box<dyn VideoStream>, CameraError> {
    let mut last_err = CameraError::NotFound;
    for constraints in chain {
        match camera.acquire(constraints).await {
            Ok(stream) => {
                debug!("Camera acquired with {:?}", constraints);
                return Ok(stream);
            }
            Err(e) => {
                warn!("Camera acquisition with {:?} failed: {}", constraints, e);
                last_err = e;
            }
        }
    }
    Err(last_err)
}
