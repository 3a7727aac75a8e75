//! Tracking state machine.
//!
//! The tracker owns the session: running/idle state, sensor access, the
//! step detector and the counters. It is a synchronous update function over
//! [`Event`]s; anything that touches the outside world (subscribing the
//! sensor, arming the ticker, prompting for permission) is returned as an
//! [`Effect`] for the runtime to carry out.
//!
//! Every start opens a new epoch. Samples and ticks carry the epoch they were
//! produced under and are discarded unless it is the current one and the
//! tracker is running.

use crate::collector::{AccelerationSample, Availability, PermissionState};
use crate::core::counters::{
    distance_km, format_distance, format_duration, SessionCounters, STEP_LENGTH_M,
};
use crate::core::detector::{DetectorConfig, StepDetector};
use crate::diagnostics::{create_shared_stats, SharedSessionStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const STATUS_READY: &str = "Press 'Start' to begin tracking.";
pub const STATUS_RUNNING: &str = "Tracking active. Start walking!";
pub const STATUS_RESET: &str = "Counter reset. Press 'Start' to begin tracking.";
pub const STATUS_UNSUPPORTED: &str = "Motion sensor not supported.";
pub const STATUS_DENIED: &str = "Permission denied. Cannot track steps.";
pub const STATUS_REQUEST_FAILED: &str = "Error requesting motion permission.";
pub const STATUS_SOURCE_FAILED: &str = "Motion sensor unavailable. Press 'Start' to retry.";

pub const LABEL_START: &str = "Start Tracking";
pub const LABEL_STOP: &str = "Stop Tracking";
pub const LABEL_DENIED: &str = "Permission Denied";

/// Whether samples are being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Idle,
    Running,
}

/// Progress of obtaining sensor access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorAccess {
    /// Not checked yet, or the last request failed
    Unresolved,
    /// A permission request is in flight
    Requesting,
    Granted,
    /// Terminal for the process
    Denied,
    /// Terminal for the process
    Unsupported,
}

/// Reasons tracking cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    #[error("Motion sensor not supported")]
    SensorUnsupported,

    #[error("Motion permission denied")]
    PermissionDenied,

    #[error("Permission request failed: {0}")]
    PermissionRequestFailed(String),

    #[error("Motion source failed: {0}")]
    SourceFailed(String),
}

/// Control surface commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start when idle, stop when running
    Toggle,
    /// Stop if running, then zero everything
    Reset,
    /// Stop if running
    Stop,
}

/// Everything the tracker reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(Command),
    Sample {
        epoch: u64,
        sample: AccelerationSample,
    },
    Tick {
        epoch: u64,
    },
    PermissionResolved(Result<PermissionState, String>),
    SourceExhausted {
        epoch: u64,
    },
    /// The source refused the subscription opened for `epoch`.
    SourceFailed {
        epoch: u64,
        reason: String,
    },
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    RequestPermission,
    Subscribe { epoch: u64 },
    Unsubscribe,
    StartTicker { epoch: u64 },
    StopTicker,
}

/// Identity of a tracking session. Survives pause/resume, cleared by reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    fn begin() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

/// Tracker parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub detector: DetectorConfig,
    pub step_length_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            step_length_m: STEP_LENGTH_M,
        }
    }
}

/// State that display collaborators need after each transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: TrackingState,
    pub access: SensorAccess,
    pub step_count: u64,
    pub distance_km: f64,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub duration_text: String,
    pub status: String,
    pub start_label: String,
    pub start_enabled: bool,
    pub not_supported: bool,
    pub awaiting_permission: bool,
    pub error: Option<String>,
    pub session_id: Option<Uuid>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub source_exhausted: bool,
}

pub struct Tracker {
    config: TrackerConfig,
    availability: Availability,
    state: TrackingState,
    access: SensorAccess,
    epoch: u64,
    detector: StepDetector,
    counters: SessionCounters,
    session: Option<SessionInfo>,
    status: String,
    last_error: Option<TrackingError>,
    source_exhausted: bool,
    stats: SharedSessionStats,
}

impl Tracker {
    pub fn new(config: TrackerConfig, availability: Availability) -> Self {
        Self::with_stats(config, availability, create_shared_stats())
    }

    pub fn with_stats(
        config: TrackerConfig,
        availability: Availability,
        stats: SharedSessionStats,
    ) -> Self {
        Self {
            detector: StepDetector::new(config.detector.clone()),
            config,
            availability,
            state: TrackingState::Idle,
            access: SensorAccess::Unresolved,
            epoch: 0,
            counters: SessionCounters::new(),
            session: None,
            status: STATUS_READY.to_string(),
            last_error: None,
            source_exhausted: false,
            stats,
        }
    }

    /// Apply one event and return the effects it requires.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Command(Command::Toggle) => self.toggle(),
            Event::Command(Command::Reset) => self.reset(),
            Event::Command(Command::Stop) => self.stop(),
            Event::Sample { epoch, sample } => {
                self.on_sample(epoch, &sample);
                Vec::new()
            }
            Event::Tick { epoch } => {
                self.on_tick(epoch);
                Vec::new()
            }
            Event::PermissionResolved(outcome) => self.on_permission(outcome),
            Event::SourceExhausted { epoch } => {
                if epoch == self.epoch {
                    tracing::info!(epoch, "motion source exhausted");
                    self.source_exhausted = true;
                }
                Vec::new()
            }
            Event::SourceFailed { epoch, reason } => self.on_source_failed(epoch, reason),
        }
    }

    /// Whether a toggle from idle could lead to tracking.
    pub fn check_start(&self) -> Result<(), TrackingError> {
        match self.access {
            SensorAccess::Denied => Err(TrackingError::PermissionDenied),
            SensorAccess::Unsupported => Err(TrackingError::SensorUnsupported),
            _ if self.availability == Availability::Unsupported => {
                Err(TrackingError::SensorUnsupported)
            }
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn access(&self) -> SensorAccess {
        self.access
    }

    pub fn is_running(&self) -> bool {
        self.state == TrackingState::Running
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn detector(&self) -> &StepDetector {
        &self.detector
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.session
    }

    pub fn last_error(&self) -> Option<&TrackingError> {
        self.last_error.as_ref()
    }

    pub fn source_exhausted(&self) -> bool {
        self.source_exhausted
    }

    pub fn stats(&self) -> &SharedSessionStats {
        &self.stats
    }

    pub fn distance_km(&self) -> f64 {
        distance_km(self.counters.step_count, self.config.step_length_m)
    }

    pub fn snapshot(&self) -> Snapshot {
        let distance = self.distance_km();
        let start_label = match (self.state, self.access) {
            (TrackingState::Running, _) => LABEL_STOP,
            (_, SensorAccess::Denied) => LABEL_DENIED,
            _ => LABEL_START,
        };

        Snapshot {
            state: self.state,
            access: self.access,
            step_count: self.counters.step_count,
            distance_km: distance,
            distance_text: format_distance(distance),
            duration_seconds: self.counters.duration_seconds,
            duration_text: format_duration(self.counters.duration_seconds),
            status: self.status.clone(),
            start_label: start_label.to_string(),
            start_enabled: !matches!(
                self.access,
                SensorAccess::Denied | SensorAccess::Unsupported | SensorAccess::Requesting
            ),
            not_supported: self.access == SensorAccess::Unsupported,
            awaiting_permission: self.access == SensorAccess::Requesting,
            error: self.last_error.as_ref().map(|e| e.to_string()),
            session_id: self.session.map(|s| s.id),
            session_started_at: self.session.map(|s| s.started_at),
            source_exhausted: self.source_exhausted,
        }
    }

    fn toggle(&mut self) -> Vec<Effect> {
        if self.is_running() {
            return self.stop();
        }

        if let Err(e) = self.check_start() {
            if self.availability == Availability::Unsupported {
                self.access = SensorAccess::Unsupported;
                self.status = STATUS_UNSUPPORTED.to_string();
            }
            tracing::warn!("Cannot start tracking: {}", e);
            self.last_error = Some(e);
            return Vec::new();
        }

        match self.access {
            SensorAccess::Granted => self.start(),
            SensorAccess::Requesting => {
                tracing::debug!("permission request already pending");
                Vec::new()
            }
            SensorAccess::Unresolved if self.availability == Availability::Implicit => {
                self.access = SensorAccess::Granted;
                self.start()
            }
            SensorAccess::Unresolved => {
                tracing::info!("requesting motion permission");
                self.access = SensorAccess::Requesting;
                self.stats.record_permission_request();
                vec![Effect::RequestPermission]
            }
            SensorAccess::Denied | SensorAccess::Unsupported => Vec::new(),
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        if self.is_running() {
            return Vec::new();
        }

        self.epoch += 1;
        self.state = TrackingState::Running;
        self.source_exhausted = false;
        self.last_error = None;
        self.status = STATUS_RUNNING.to_string();
        let session = *self.session.get_or_insert_with(SessionInfo::begin);
        self.stats.record_session_started();

        tracing::info!(epoch = self.epoch, session = %session.id, "tracking started");
        vec![
            Effect::Subscribe { epoch: self.epoch },
            Effect::StartTicker { epoch: self.epoch },
        ]
    }

    fn stop(&mut self) -> Vec<Effect> {
        if !self.is_running() {
            return Vec::new();
        }

        self.state = TrackingState::Idle;
        self.status = format!(
            "Tracking paused. Total steps: {}.",
            self.counters.step_count
        );

        tracing::info!(
            epoch = self.epoch,
            steps = self.counters.step_count,
            duration_secs = self.counters.duration_seconds,
            "tracking stopped"
        );
        vec![Effect::StopTicker, Effect::Unsubscribe]
    }

    fn reset(&mut self) -> Vec<Effect> {
        let effects = self.stop();

        self.counters.reset();
        self.detector.reset();
        self.session = None;
        self.stats.record_reset();

        // Terminal access failures keep their message.
        if !matches!(
            self.access,
            SensorAccess::Denied | SensorAccess::Unsupported
        ) {
            self.status = STATUS_RESET.to_string();
        }

        tracing::info!("step counter reset");
        effects
    }

    fn on_permission(&mut self, outcome: Result<PermissionState, String>) -> Vec<Effect> {
        if self.access != SensorAccess::Requesting {
            tracing::debug!("ignoring unsolicited permission answer");
            return Vec::new();
        }

        match outcome {
            Ok(PermissionState::Granted) => {
                tracing::info!("motion permission granted");
                self.access = SensorAccess::Granted;
                self.start()
            }
            Ok(PermissionState::Denied) => {
                tracing::warn!("motion permission denied");
                self.access = SensorAccess::Denied;
                self.status = STATUS_DENIED.to_string();
                self.last_error = Some(TrackingError::PermissionDenied);
                Vec::new()
            }
            Err(reason) => {
                tracing::warn!("Error requesting motion permission: {}", reason);
                self.access = SensorAccess::Unresolved;
                self.status = STATUS_REQUEST_FAILED.to_string();
                self.last_error = Some(TrackingError::PermissionRequestFailed(reason));
                Vec::new()
            }
        }
    }

    fn on_source_failed(&mut self, epoch: u64, reason: String) -> Vec<Effect> {
        if !self.is_running() || epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "ignoring stale source failure");
            return Vec::new();
        }

        tracing::warn!("Motion source failed: {}", reason);
        let effects = self.stop();
        self.status = STATUS_SOURCE_FAILED.to_string();
        self.last_error = Some(TrackingError::SourceFailed(reason));
        effects
    }

    fn on_sample(&mut self, epoch: u64, sample: &AccelerationSample) {
        self.stats.record_sample_received();
        if !self.is_running() || epoch != self.epoch {
            self.stats.record_sample_discarded();
            tracing::debug!(epoch, current = self.epoch, "discarding sample");
            return;
        }

        if self.detector.process_sample(sample) {
            self.counters.record_step();
            self.stats.record_step();
            tracing::debug!(
                steps = self.counters.step_count,
                t = sample.timestamp_ms,
                "step registered"
            );
        }
    }

    fn on_tick(&mut self, epoch: u64) {
        if !self.is_running() || epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "discarding tick");
            return;
        }
        self.counters.tick();
        self.stats.record_tick();
    }
}
