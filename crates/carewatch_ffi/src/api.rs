//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose geofence evaluation, fence authoring and live monitoring
//!   sessions to Dart via FRB.
//! - Bridge platform services (push, dialogs, background location) through
//!   process-wide host adapters that Dart drains or configures.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call that mutates session state pumps the affected sessions
//!   before returning, so alerts are queued synchronously.

use carewatch_core::{
    core_version as core_version_inner, evaluate, init_logging as init_logging_inner,
    ping as ping_inner, AlertPresenter, AppLifecycle, BackgroundSampler, Collaborators,
    Coordinate, DispatchError, Geofence, GeofenceDraft, GeofenceRecord, GeofenceSource, HostFeed,
    LocationRecord, MonitorConfig, MonitorSession, MonitorSnapshot, NotificationSender,
    PatientRef, PositionSource, RepeatingTimer, SamplerConfig, SamplerError, ThreadTimer,
};
use log::warn;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

static HOST: OnceLock<HostServices> = OnceLock::new();
static SESSIONS: OnceLock<Mutex<BTreeMap<String, MonitorSession>>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; returns the Cargo package version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Containment result for one coordinate/fence pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainmentResponse {
    pub ok: bool,
    pub inside: bool,
    pub distance_meters: f64,
    pub message: String,
}

/// Fence editor validation result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceDraftResponse {
    pub ok: bool,
    /// Radius after snapping to the editor grid.
    pub radius_meters: f64,
    pub message: String,
}

/// Generic action response envelope for monitoring calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorActionResponse {
    pub ok: bool,
    pub session_id: Option<String>,
    pub message: String,
}

impl MonitorActionResponse {
    fn success(message: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            ok: true,
            session_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            session_id: None,
            message: message.into(),
        }
    }
}

/// Flattened monitoring view for the live-location screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorView {
    pub ok: bool,
    pub message: String,
    /// `inside|outside`.
    pub state: String,
    pub status_text: String,
    pub alert_text: Option<String>,
    pub marker_color: String,
    pub distance_meters: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fence_latitude: Option<f64>,
    pub fence_longitude: Option<f64>,
    pub fence_radius_meters: Option<f64>,
    pub fence_fill_color: Option<String>,
    pub fence_stroke_color: Option<String>,
    pub fence_visible: bool,
    pub alert_active: bool,
    pub background_sampling: bool,
    pub errors: Vec<String>,
}

/// Alert or notification queued for Dart to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAlert {
    /// `dialog|notification`.
    pub kind: String,
    pub title: String,
    pub body: String,
}

/// Evaluates whether a coordinate lies inside a circular fence.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Invalid input yields `ok=false` with a message instead of panicking.
#[flutter_rust_bridge::frb(sync)]
pub fn evaluate_containment(
    latitude: f64,
    longitude: f64,
    center_latitude: f64,
    center_longitude: f64,
    radius_meters: f64,
) -> ContainmentResponse {
    let checked = Coordinate::new(latitude, longitude).and_then(|position| {
        let center = Coordinate::new(center_latitude, center_longitude)?;
        let fence = Geofence::new(center, radius_meters, 0)?;
        Ok(evaluate(&position, &fence))
    });
    match checked {
        Ok(result) => ContainmentResponse {
            ok: true,
            inside: result.inside,
            distance_meters: result.distance_meters,
            message: String::new(),
        },
        Err(err) => ContainmentResponse {
            ok: false,
            inside: true,
            distance_meters: 0.0,
            message: format!("evaluate_containment failed: {err}"),
        },
    }
}

/// Validates a fence before the caretaker saves it.
///
/// On success, also publishes the fence to live sessions for `patient_id`.
///
/// # FFI contract
/// - Sync call; pumps live sessions before returning.
/// - Never panics; `radius_meters` is always the snapped radius, even on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn geofence_save(
    caretaker_id: String,
    patient_id: String,
    center_latitude: Option<f64>,
    center_longitude: Option<f64>,
    radius_meters: f64,
) -> GeofenceDraftResponse {
    let mut draft = GeofenceDraft::new();
    draft.set_radius(radius_meters);
    let radius = draft.radius_meters();

    if let (Some(latitude), Some(longitude)) = (center_latitude, center_longitude) {
        match Coordinate::new(latitude, longitude) {
            Ok(center) => draft.set_center(center),
            Err(err) => return draft_failure(radius, format!("invalid center: {err}")),
        }
    }

    match draft.build(&caretaker_id, &patient_id, now_epoch_ms()) {
        Ok(document) => {
            host()
                .feed
                .push_geofence(&document.patient_id, GeofenceRecord::from(document.geofence));
            pump_all();
            GeofenceDraftResponse {
                ok: true,
                radius_meters: radius,
                message: "Geofence saved successfully!".to_string(),
            }
        }
        Err(err) => draft_failure(radius, err.to_string()),
    }
}

/// Starts a monitoring session for one patient.
///
/// `config_json` uses the core config schema; `None` applies defaults.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics; returns `ok=false` with a message on config or subscribe failure.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_start(
    patient_id: String,
    display_name: String,
    config_json: Option<String>,
) -> MonitorActionResponse {
    let config = match config_json.as_deref().map(MonitorConfig::from_json_str) {
        None => MonitorConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            return MonitorActionResponse::failure(format!("monitor_start failed: {err}"))
        }
    };

    let host = host();
    let collaborators = Collaborators {
        positions: Arc::clone(&host.feed) as Arc<dyn PositionSource>,
        geofences: Arc::clone(&host.feed) as Arc<dyn GeofenceSource>,
        notifier: Arc::clone(&host.outbox) as Arc<dyn NotificationSender>,
        presenter: Arc::clone(&host.outbox) as Arc<dyn AlertPresenter>,
        sampler: Arc::clone(&host.sampler) as Arc<dyn BackgroundSampler>,
        timer: Arc::clone(&host.timer) as Arc<dyn RepeatingTimer>,
    };

    match MonitorSession::start(PatientRef::new(patient_id, display_name), config, collaborators)
    {
        Ok(mut session) => {
            session.pump();
            let session_id = session.id().to_string();
            sessions().insert(session_id.clone(), session);
            MonitorActionResponse::success("Monitoring started.", Some(session_id))
        }
        Err(err) => match err.category() {
            Some(category) => MonitorActionResponse::failure(format!(
                "monitor_start failed [{}]: {err}",
                category.as_str()
            )),
            None => MonitorActionResponse::failure(format!("monitor_start failed: {err}")),
        },
    }
}

/// Publishes the patient's latest location and pumps live sessions.
///
/// Missing coordinates are forwarded as-is; sessions skip them.
///
/// # FFI contract
/// - Sync call; pumps live sessions before returning.
/// - Never panics; returns the number of sessions the record was delivered to.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_push_position(
    patient_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    observed_at_ms: Option<i64>,
) -> u32 {
    let delivered = host().feed.push_position(
        &patient_id,
        LocationRecord {
            latitude,
            longitude,
            observed_at_ms,
        },
    );
    pump_all();
    delivered as u32
}

/// Publishes a fence record and pumps live sessions.
///
/// # FFI contract
/// - Sync call; malformed records are delivered and skipped by sessions.
/// - Never panics; returns the number of sessions the record was delivered to.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_push_geofence(
    patient_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_meters: Option<f64>,
    defined_at_ms: Option<i64>,
) -> u32 {
    let delivered = host().feed.push_geofence(
        &patient_id,
        GeofenceRecord {
            latitude,
            longitude,
            radius: radius_meters,
            timestamp: defined_at_ms,
        },
    );
    pump_all();
    delivered as u32
}

/// Forwards an app lifecycle change (`active|inactive|background`).
///
/// # FFI contract
/// - Sync call; sampler failures are surfaced in the snapshot, not here.
/// - Never panics; unknown states and sessions yield `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_app_lifecycle(session_id: String, state: String) -> MonitorActionResponse {
    let event = match state.trim().to_ascii_lowercase().as_str() {
        "active" | "resumed" => AppLifecycle::Active,
        "inactive" => AppLifecycle::Inactive,
        "background" | "paused" => AppLifecycle::Background,
        other => {
            return MonitorActionResponse::failure(format!("unsupported lifecycle state `{other}`"))
        }
    };
    with_session(&session_id, |session| {
        session.on_lifecycle(event);
        MonitorActionResponse::success("Lifecycle applied.", Some(session.id().to_string()))
    })
}

/// Delivers one sample from the platform background location task.
///
/// # FFI contract
/// - Sync call; the sample is dropped unless the session forwards samples.
/// - Never panics; unknown sessions yield `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_background_sample(
    session_id: String,
    latitude: f64,
    longitude: f64,
    observed_at_ms: Option<i64>,
) -> MonitorActionResponse {
    with_session(&session_id, |session| {
        let record = LocationRecord::new(latitude, longitude, observed_at_ms);
        let message = match session.on_background_sample(record) {
            Some(transition) => format!("Background sample applied: {transition:?}."),
            None => "Background sample recorded.".to_string(),
        };
        MonitorActionResponse::success(message, Some(session.id().to_string()))
    })
}

/// Records whether background location permission is granted.
///
/// # FFI contract
/// - Sync call, process-wide; applies to the next sampler start.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_set_background_permission(granted: bool) {
    host().sampler.permission.store(granted, Ordering::Release);
}

/// Returns the current view for one session.
///
/// # FFI contract
/// - Sync call; pumps the session before reading.
/// - Never panics; unknown sessions yield `ok=false` with an empty view.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_snapshot(session_id: String) -> MonitorView {
    let Some(key) = normalize_session_id(&session_id) else {
        return empty_view(format!("invalid session id `{session_id}`"));
    };
    let mut sessions = sessions();
    match sessions.get_mut(&key) {
        Some(session) => {
            session.pump();
            to_view(session.snapshot())
        }
        None => empty_view(format!("session not found: {key}")),
    }
}

/// Drains dialogs and notifications queued since the last call.
///
/// # FFI contract
/// - Sync call, non-blocking; each alert is returned exactly once.
/// - Never panics; returns an empty list when nothing is queued.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_drain_alerts() -> Vec<HostAlert> {
    std::mem::take(&mut *lock(&host().outbox.queue))
}

/// Tears down a session and releases its subscriptions and timers.
///
/// # FFI contract
/// - Sync call; no alert or blink tick is produced for the session afterwards.
/// - Never panics; a second stop for the same id yields `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_stop(session_id: String) -> MonitorActionResponse {
    let Some(key) = normalize_session_id(&session_id) else {
        return MonitorActionResponse::failure(format!("invalid session id `{session_id}`"));
    };
    match sessions().remove(&key) {
        Some(mut session) => {
            session.teardown();
            MonitorActionResponse::success("Monitoring stopped.", Some(key))
        }
        None => MonitorActionResponse::failure(format!("session not found: {key}")),
    }
}

struct HostServices {
    feed: Arc<HostFeed>,
    outbox: Arc<HostOutbox>,
    sampler: Arc<HostSampler>,
    timer: Arc<ThreadTimer>,
}

#[derive(Default)]
struct HostOutbox {
    queue: Mutex<Vec<HostAlert>>,
}

impl HostOutbox {
    fn enqueue(&self, kind: &str, title: &str, body: &str) {
        lock(&self.queue).push(HostAlert {
            kind: kind.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
    }
}

impl NotificationSender for HostOutbox {
    fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        self.enqueue("notification", title, body);
        Ok(())
    }
}

impl AlertPresenter for HostOutbox {
    fn show_alert(&self, title: &str, body: &str) {
        self.enqueue("dialog", title, body);
    }
}

/// Background sampling is started by Dart; Rust only gates on permission.
struct HostSampler {
    permission: AtomicBool,
}

impl BackgroundSampler for HostSampler {
    fn start(&self, _config: &SamplerConfig) -> Result<(), SamplerError> {
        if !self.permission.load(Ordering::Acquire) {
            return Err(SamplerError::PermissionDenied(
                "background location permission not granted".to_string(),
            ));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), SamplerError> {
        Ok(())
    }
}

fn host() -> &'static HostServices {
    HOST.get_or_init(|| HostServices {
        feed: Arc::new(HostFeed::new()),
        outbox: Arc::new(HostOutbox::default()),
        sampler: Arc::new(HostSampler {
            permission: AtomicBool::new(false),
        }),
        timer: Arc::new(ThreadTimer::new()),
    })
}

fn sessions() -> MutexGuard<'static, BTreeMap<String, MonitorSession>> {
    lock(SESSIONS.get_or_init(|| Mutex::new(BTreeMap::new())))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("event=ffi_lock module=ffi status=recovered reason=poisoned");
        poisoned.into_inner()
    })
}

fn pump_all() {
    for session in sessions().values_mut() {
        session.pump();
    }
}

fn with_session(
    session_id: &str,
    f: impl FnOnce(&mut MonitorSession) -> MonitorActionResponse,
) -> MonitorActionResponse {
    let Some(key) = normalize_session_id(session_id) else {
        return MonitorActionResponse::failure(format!("invalid session id `{session_id}`"));
    };
    let mut sessions = sessions();
    match sessions.get_mut(&key) {
        Some(session) => {
            session.pump();
            f(session)
        }
        None => MonitorActionResponse::failure(format!("session not found: {key}")),
    }
}

fn normalize_session_id(session_id: &str) -> Option<String> {
    Uuid::parse_str(session_id.trim())
        .ok()
        .map(|id| id.to_string())
}

fn draft_failure(radius_meters: f64, message: String) -> GeofenceDraftResponse {
    GeofenceDraftResponse {
        ok: false,
        radius_meters,
        message,
    }
}

fn to_view(snapshot: MonitorSnapshot) -> MonitorView {
    let overlay = snapshot.fence_overlay.as_ref();
    MonitorView {
        ok: true,
        message: String::new(),
        state: snapshot.state.as_str().to_string(),
        status_text: snapshot.status_text,
        alert_text: snapshot.alert_text,
        marker_color: snapshot.marker_color.to_string(),
        distance_meters: snapshot.distance_meters,
        latitude: snapshot.position.map(|position| position.latitude),
        longitude: snapshot.position.map(|position| position.longitude),
        fence_latitude: snapshot.geofence.map(|fence| fence.center.latitude),
        fence_longitude: snapshot.geofence.map(|fence| fence.center.longitude),
        fence_radius_meters: snapshot.geofence.map(|fence| fence.radius_meters),
        fence_fill_color: overlay.map(|overlay| overlay.fill_color.to_string()),
        fence_stroke_color: overlay.map(|overlay| overlay.stroke_color.to_string()),
        fence_visible: overlay.is_some_and(|overlay| overlay.visible),
        alert_active: snapshot.alert_active,
        background_sampling: snapshot.background_sampling,
        errors: snapshot
            .errors
            .iter()
            .map(|category| category.as_str().to_string())
            .collect(),
    }
}

fn empty_view(message: String) -> MonitorView {
    MonitorView {
        ok: false,
        message,
        state: "inside".to_string(),
        status_text: String::new(),
        alert_text: None,
        marker_color: String::new(),
        distance_meters: None,
        latitude: None,
        longitude: None,
        fence_latitude: None,
        fence_longitude: None,
        fence_radius_meters: None,
        fence_fill_color: None,
        fence_stroke_color: None,
        fence_visible: false,
        alert_active: false,
        background_sampling: false,
        errors: Vec::new(),
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, evaluate_containment, geofence_save, init_logging, monitor_app_lifecycle,
        monitor_drain_alerts, monitor_push_position, monitor_snapshot, monitor_start,
        monitor_stop, ping,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/carewatch-logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn evaluate_containment_reports_distance_and_rejects_bad_radius() {
        let response = evaluate_containment(0.0, 0.008, 0.0, 0.0, 1_000.0);
        assert!(response.ok, "{}", response.message);
        assert!(response.inside);
        assert!((response.distance_meters - 889.56).abs() < 1.0);

        let invalid = evaluate_containment(0.0, 0.0, 0.0, 0.0, -1.0);
        assert!(!invalid.ok);
        assert!(invalid.message.contains("radius"));
    }

    #[test]
    fn geofence_save_requires_center() {
        let response = geofence_save("c1".to_string(), "p1".to_string(), None, None, 130.0);
        assert!(!response.ok);
        assert_eq!(response.radius_meters, 150.0);
    }

    #[test]
    fn monitor_start_rejects_bad_config_without_session() {
        let response = monitor_start(
            unique_token("patient"),
            "Ayesha".to_string(),
            Some(r#"{"blink_interval_ms": 0}"#.to_string()),
        );
        assert!(!response.ok);
        assert!(response.session_id.is_none());
        assert!(response.message.starts_with("monitor_start failed: "));
    }

    #[test]
    fn monitoring_session_round_trip() {
        let patient_id = unique_token("patient");
        let started = monitor_start(patient_id.clone(), "Ayesha".to_string(), None);
        assert!(started.ok, "{}", started.message);
        let session_id = started.session_id.expect("session id");

        let saved = geofence_save(
            "caretaker".to_string(),
            patient_id.clone(),
            Some(0.0),
            Some(0.0),
            1_000.0,
        );
        assert!(saved.ok, "{}", saved.message);

        assert_eq!(monitor_push_position(patient_id.clone(), Some(0.0), Some(0.02), None), 1);
        let view = monitor_snapshot(session_id.clone());
        assert!(view.ok, "{}", view.message);
        assert_eq!(view.state, "outside");
        assert!(view.alert_active);

        let alerts = monitor_drain_alerts();
        let body = "Your patient Ayesha has left the designated area!";
        assert!(alerts
            .iter()
            .any(|alert| alert.kind == "notification" && alert.body == body));

        let lifecycle = monitor_app_lifecycle(session_id.clone(), "background".to_string());
        assert!(lifecycle.ok, "{}", lifecycle.message);
        let view = monitor_snapshot(session_id.clone());
        assert!(view.errors.contains(&"permission_denied".to_string()));

        assert!(monitor_stop(session_id.clone()).ok);
        assert!(!monitor_stop(session_id.clone()).ok);
        assert!(!monitor_snapshot(session_id).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
