//! Live emotion detector — runs a face/expression model against a camera stream,
//! draws overlays, and reports stabilized expression changes.
//!
//! The loop is a spawned task paced by a 100 ms interval. Ticks never overlap: a
//! slow inference call delays the next tick instead of queueing more work. Every
//! await point is followed by a cancellation check, so a tick that finishes after
//! `stop` neither draws nor emits.

pub mod camera;
pub mod gate;
pub mod model;
pub mod remote;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::DetectorEvent;
use crate::types::{Detection, DetectorStatus};

use camera::{Camera, CameraDevice, CameraError, VideoStream};
use gate::EmissionGate;
use model::{Backend, ExpressionModel, Surface};

/// Detection passes per second.
pub const TARGET_FPS: u64 = 10;

/// Square input resolution handed to the model.
pub const INPUT_SIZE: u32 = 224;

const TICK_INTERVAL: Duration = Duration::from_millis(1000 / TARGET_FPS);

const MODEL_LOAD_MESSAGE: &str = "表情認識モデルの読み込みに失敗しました";
const CANCELLED_MESSAGE: &str = "カメラの起動を中止しました";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("expression model failed to load: {0}")]
    ModelLoad(String),
    #[error("expression model unavailable after an earlier load failure")]
    ModelUnavailable,
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("start abandoned, detector was stopped while it was starting")]
    Cancelled,
}

impl DetectorError {
    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            DetectorError::ModelLoad(_) | DetectorError::ModelUnavailable => {
                MODEL_LOAD_MESSAGE.to_string()
            }
            DetectorError::Camera(e) => e.user_message(),
            DetectorError::Cancelled => CANCELLED_MESSAGE.to_string(),
        }
    }
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    stream: Arc<Mutex<Box<dyn VideoStream>>>,
}

struct Shared {
    model: Arc<dyn ExpressionModel>,
    camera: Arc<dyn Camera>,
    surface: Mutex<Box<dyn Surface>>,
    gate: Mutex<EmissionGate>,
    /// Outcome of the one model load, once it finished
    models: watch::Sender<Option<Result<Backend, String>>>,
    load_started: AtomicBool,
    /// Bumped by every stop; a start that sees it move gives up
    stop_epoch: AtomicU64,
    session: tokio::sync::Mutex<Option<Session>>,
    preferred_device: Mutex<Option<String>>,
    status: watch::Sender<DetectorStatus>,
    visible: watch::Sender<bool>,
    event_tx: broadcast::Sender<DetectorEvent>,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn broadcast(&self, event: DetectorEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_status(&self, status: DetectorStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!("Detector {} -> {}", previous, status);
            self.broadcast(DetectorEvent::Status(status));
        }
    }

    /// Release everything a session holds. Cancels first so an in-flight tick
    /// sees the flag before it touches the surface or the gate.
    fn teardown(&self, session: Session) {
        session.cancel.cancel();
        session.task.abort();
        lock(&session.stream).stop_tracks();
        self.reset_outputs();
    }

    /// Keep the preferred device pointing at an attached camera: the first one
    /// listed when nothing (or a vanished device) was selected.
    fn adopt_devices(&self, devices: &[CameraDevice]) {
        let mut preferred = lock(&self.preferred_device);
        let attached = preferred
            .as_ref()
            .is_some_and(|id| devices.iter().any(|d| &d.id == id));
        if !attached {
            *preferred = devices.first().map(|d| d.id.clone());
        }
    }

    fn reset_outputs(&self) {
        lock(&self.surface).clear();
        lock(&self.gate).reset();
    }

    async fn tick(&self, stream: &Mutex<Box<dyn VideoStream>>, cancel: &CancellationToken) {
        let frame = match lock(stream).current_frame() {
            Some(frame) if frame.is_decoded() => frame,
            _ => return,
        };

        {
            let mut surface = lock(&self.surface);
            if surface.size() != (frame.width, frame.height) {
                surface.resize(frame.width, frame.height);
            }
        }

        let detections = match self.model.detect(&frame, INPUT_SIZE).await {
            Ok(d) => d,
            Err(e) => {
                warn!("Expression inference failed: {:#}", e);
                Vec::new()
            }
        };

        {
            let mut surface = lock(&self.surface);
            if cancel.is_cancelled() {
                return;
            }
            surface.clear();
            for d in &detections {
                surface.draw_box(&d.bounding_box);
            }
        }

        let Some(top) = detections.first().and_then(Detection::dominant) else {
            return;
        };

        let mut gate = lock(&self.gate);
        if cancel.is_cancelled() {
            return;
        }
        if gate.offer(&top.label, top.score, Instant::now()) {
            debug!("Expression {} ({:.2})", top.label, top.score);
            self.broadcast(DetectorEvent::Emotion(top.label.clone()));
        }
    }
}

/// The one model load of a detector. Runs detached from whichever `start`
/// triggered it, so dropping that caller does not abandon the load.
async fn load_models(shared: Arc<Shared>) {
    let worker = Arc::clone(&shared);
    let joined = tokio::spawn(async move {
        model::prepare(worker.model.as_ref())
            .await
            .map_err(|e| format!("{:#}", e))
    })
    .await;
    let result = joined.unwrap_or_else(|e| Err(format!("model load task failed: {}", e)));

    match &result {
        Ok(_) => shared.set_status(DetectorStatus::Idle),
        Err(msg) => {
            error!("Expression model load failed: {}", msg);
            shared.set_status(DetectorStatus::Failed);
            shared.broadcast(DetectorEvent::Error(MODEL_LOAD_MESSAGE.to_string()));
        }
    }
    shared.models.send_replace(Some(result));
}

async fn run_loop(
    shared: Arc<Shared>,
    stream: Arc<Mutex<Box<dyn VideoStream>>>,
    cancel: CancellationToken,
) {
    let mut visible = shared.visible.subscribe();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if !*visible.borrow_and_update() {
            debug!("Page hidden, detection paused");
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        shared.tick(&stream, &cancel).await;
    }

    debug!("Detection loop exited");
}

/// Handle returned by [`LiveDetector::on_event`] and
/// [`LiveDetector::on_devices_changed`]. Dropping it unsubscribes.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One detector instance owns one camera stream and one drawing surface.
/// Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct LiveDetector {
    shared: Arc<Shared>,
}

impl LiveDetector {
    pub fn new(
        model: Arc<dyn ExpressionModel>,
        camera: Arc<dyn Camera>,
        surface: Box<dyn Surface>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let (status, _) = watch::channel(DetectorStatus::Uninitialized);
        let (visible, _) = watch::channel(true);
        let (models, _) = watch::channel(None);

        Self {
            shared: Arc::new(Shared {
                model,
                camera,
                surface: Mutex::new(surface),
                gate: Mutex::new(EmissionGate::new()),
                models,
                load_started: AtomicBool::new(false),
                stop_epoch: AtomicU64::new(0),
                session: tokio::sync::Mutex::new(None),
                preferred_device: Mutex::new(None),
                status,
                visible,
                event_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectorEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Call `callback` for every event until the returned handle is dropped.
    /// Must be called from within a tokio runtime.
    pub fn on_event<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(DetectorEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Detector subscriber lagged {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task }
    }

    pub fn status(&self) -> DetectorStatus {
        *self.shared.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<DetectorStatus> {
        self.shared.status.subscribe()
    }

    /// Page visibility. While hidden the loop stays Active but runs no inference.
    pub fn set_visible(&self, visible: bool) {
        self.shared.visible.send_replace(visible);
    }

    /// Device tried first on the next start.
    pub fn select_device(&self, device_id: Option<String>) {
        *lock(&self.shared.preferred_device) = device_id;
    }

    /// Label most recently surfaced by the running session.
    pub fn live_label(&self) -> Option<String> {
        lock(&self.shared.gate).last_label().map(String::from)
    }

    /// List attached cameras. The preferred device follows the list: with no
    /// selection, or a selection that was unplugged, it becomes the first one.
    pub async fn devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let devices = self.shared.camera.devices().await?;
        self.shared.adopt_devices(&devices);
        Ok(devices)
    }

    /// Call `callback` with the fresh device list whenever cameras are plugged
    /// or unplugged, until the returned handle is dropped. None if the camera
    /// does not report changes.
    pub fn on_devices_changed<F>(&self, mut callback: F) -> Option<Subscription>
    where
        F: FnMut(Vec<CameraDevice>) + Send + 'static,
    {
        let mut changes = self.shared.camera.device_changes()?;
        let detector = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => match detector.devices().await {
                        Ok(devices) => callback(devices),
                        Err(e) => warn!("Camera enumeration failed: {}", e),
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Some(Subscription { task })
    }

    /// Load the model once. The first caller spawns the load and everyone,
    /// including later callers, waits on its outcome. A failed load is final
    /// for this instance.
    async fn ensure_models(&self) -> Result<Backend, DetectorError> {
        let shared = &self.shared;
        let cached = shared.models.borrow().clone();
        if let Some(result) = cached {
            return result.map_err(|_| DetectorError::ModelUnavailable);
        }

        let mut rx = shared.models.subscribe();
        if !shared.load_started.swap(true, Ordering::SeqCst) {
            shared.set_status(DetectorStatus::LoadingModel);
            tokio::spawn(load_models(Arc::clone(shared)));
        }

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(result) => result.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(backend)) => Ok(backend),
            Some(Err(msg)) => Err(DetectorError::ModelLoad(msg)),
            None => Err(DetectorError::ModelUnavailable),
        }
    }

    /// Load the model if needed, (re)acquire the camera and start the loop.
    /// A `stop` issued while this is still loading wins: the start returns
    /// `Cancelled` without touching the camera.
    pub async fn start(&self) -> Result<(), DetectorError> {
        let epoch = self.shared.stop_epoch.load(Ordering::SeqCst);
        self.ensure_models().await?;

        let unselected = lock(&self.shared.preferred_device).is_none();
        if unselected {
            if let Err(e) = self.devices().await {
                warn!("Camera enumeration failed: {}", e);
            }
        }

        let mut session = self.shared.session.lock().await;
        if self.shared.stop_epoch.load(Ordering::SeqCst) != epoch {
            info!("Start abandoned, detector stopped meanwhile");
            return Err(DetectorError::Cancelled);
        }
        if let Some(previous) = session.take() {
            info!("Releasing previous camera session before restart");
            self.shared.teardown(previous);
        }

        let preferred = lock(&self.shared.preferred_device).clone();
        let chain = camera::fallback_chain(preferred.as_deref());
        let stream = match camera::acquire_with_fallback(self.shared.camera.as_ref(), &chain).await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Camera start failed: {}", e);
                self.shared.set_status(DetectorStatus::Idle);
                self.shared.broadcast(DetectorEvent::Error(e.user_message()));
                return Err(e.into());
            }
        };

        let stream = Arc::new(Mutex::new(stream));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            Arc::clone(&stream),
            cancel.clone(),
        ));

        *session = Some(Session {
            cancel,
            task,
            stream,
        });
        self.shared.set_status(DetectorStatus::Active);
        info!("Live detection started");
        Ok(())
    }

    /// Stop the loop, release the camera, clear overlays and forget the last
    /// emitted label.
    pub async fn stop(&self) {
        self.shared.stop_epoch.fetch_add(1, Ordering::SeqCst);
        let mut session = self.shared.session.lock().await;
        match session.take() {
            Some(current) => {
                self.shared.teardown(current);
                info!("Live detection stopped");
            }
            None => self.shared.reset_outputs(),
        }

        if self.status() == DetectorStatus::Active {
            self.shared.set_status(DetectorStatus::Idle);
        }
    }

    /// Capture the current live label. Stops the loop afterwards if `stop_after`.
    pub async fn shot(&self, stop_after: bool) -> Option<String> {
        let label = self.live_label();
        info!("Shot captured: {:?}", label);
        self.shared.broadcast(DetectorEvent::Shot(label.clone()));
        if stop_after {
            self.stop().await;
        }
        label
    }
}
