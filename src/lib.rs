//! Stride Agent - accelerometer step counter.
//!
//! This library turns a stream of vertical acceleration samples into a step
//! count, a walking distance and an elapsed tracking duration, with explicit
//! start/stop/reset control and sensor permission handling.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Stride Agent                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Motion    │──▶│   Event     │──▶│   Tracker   │──▶ Snapshot
//! │  │   Source    │   │   Channel   │   │ (gate+epoch)│        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │         ▲              ▲      ▲         │       │           │
//! │         │        commands   1 Hz tick   ▼       ▼           │
//! │         │                          Detector  Counters       │
//! │         └──────── effects (subscribe, prompt, ticker) ◀─────│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use stride_agent::{Command, Pacing, PermissionMode, ReplaySource, Session, TrackerConfig};
//!
//! let source = ReplaySource::from_csv("walk.csv", Pacing::Immediate, PermissionMode::Implicit)
//!     .expect("Failed to load trace");
//! let mut session = Session::new(source, TrackerConfig::default());
//!
//! session.command(Command::Toggle);
//! while let Some(snapshot) = session.poll(std::time::Duration::from_millis(100)) {
//!     println!("{} steps", snapshot.step_count);
//! }
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod runtime;

// Re-export key types at crate root for convenience
pub use collector::{
    AccelerationSample, Availability, MotionSource, Pacing, PermissionMode, PermissionState,
    ReplaySource, SourceError, UnsupportedSource,
};
pub use config::{Config, ConfigError};
pub use crate::core::{
    Command, Event, SensorAccess, Snapshot, StepDetector, Tracker, TrackerConfig, TrackingError,
    TrackingState,
};
pub use diagnostics::{SessionStats, SharedSessionStats};
pub use runtime::{Session, TICK_INTERVAL};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
