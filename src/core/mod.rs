//! Core step-counting logic.
//!
//! This module contains:
//! - Threshold/debounce step detection
//! - Session counters and display formatting
//! - The tracking state machine that gates samples and owns the session

pub mod counters;
pub mod detector;
pub mod tracker;

// Re-export commonly used types
pub use counters::{
    distance_km, format_distance, format_duration, SessionCounters, STEP_LENGTH_M,
};
pub use detector::{
    DetectorConfig, DetectorState, StepDetector, ACCELERATION_THRESHOLD, STEP_DEBOUNCE_MS,
};
pub use tracker::{
    Command, Effect, Event, SensorAccess, SessionInfo, Snapshot, Tracker, TrackerConfig,
    TrackingError, TrackingState,
};
