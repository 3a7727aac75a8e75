//! Replay of recorded accelerometer traces.
//!
//! Samples are loaded from a CSV file with `timestamp_ms` and `z` columns
//! (other columns are ignored) and delivered from a background thread,
//! either as fast as possible or paced by their recorded timestamps.
//! Unsubscribing stops the thread and joins it; a later subscribe resumes
//! from the next undelivered sample.

use crate::collector::types::{AccelerationSample, Availability, PermissionState};
use crate::collector::{MotionSource, PermissionReply, SampleSink, SourceError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest pause inserted between two replayed samples.
const MAX_GAP: Duration = Duration::from_secs(24 * 60 * 60);

/// How replayed samples are spaced in wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Deliver back to back
    Immediate,
    /// Honour recorded gaps, divided by `speed`
    Realtime { speed: f64 },
}

impl Pacing {
    fn delay(&self, previous_ms: Option<i64>, next_ms: i64) -> Duration {
        match *self {
            Pacing::Immediate => Duration::ZERO,
            Pacing::Realtime { speed } => {
                let gap_ms = previous_ms
                    .map(|p| next_ms.saturating_sub(p).max(0))
                    .unwrap_or(0);
                if speed <= 0.0 {
                    return Duration::ZERO;
                }
                Duration::try_from_secs_f64(gap_ms as f64 / 1000.0 / speed)
                    .map_or(MAX_GAP, |gap| gap.min(MAX_GAP))
            }
        }
    }
}

/// Simulated platform permission model for a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// No prompt needed
    Implicit,
    /// Prompt, user grants
    Grant,
    /// Prompt, user refuses
    Deny,
    /// Prompt, the request itself errors
    Fail,
    /// Platform has no motion capability
    Unsupported,
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "implicit" => Ok(Self::Implicit),
            "grant" | "granted" => Ok(Self::Grant),
            "deny" | "denied" => Ok(Self::Deny),
            "fail" => Ok(Self::Fail),
            "unsupported" => Ok(Self::Unsupported),
            other => Err(format!(
                "unknown permission mode '{other}' (expected implicit, grant, deny, fail or unsupported)"
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplayRow {
    timestamp_ms: i64,
    z: f64,
}

/// Load samples from a CSV file.
pub fn load_samples_from_csv(path: impl AsRef<Path>) -> Result<Vec<AccelerationSample>, SourceError> {
    let file = std::fs::File::open(path.as_ref())?;
    load_samples(file)
}

/// Load samples from any CSV reader with a header row.
pub fn load_samples(reader: impl Read) -> Result<Vec<AccelerationSample>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (row_idx, result) in reader.deserialize::<ReplayRow>().enumerate() {
        let row = result.map_err(|e| SourceError::Parse(format!("row {}: {e}", row_idx + 1)))?;
        samples.push(AccelerationSample::new(row.z, row.timestamp_ms));
    }

    if samples.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(samples)
}

/// A motion source backed by a recorded trace.
pub struct ReplaySource {
    samples: Arc<Vec<AccelerationSample>>,
    cursor: Arc<AtomicUsize>,
    pacing: Pacing,
    permission: PermissionMode,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(samples: Vec<AccelerationSample>, pacing: Pacing, permission: PermissionMode) -> Self {
        Self {
            samples: Arc::new(samples),
            cursor: Arc::new(AtomicUsize::new(0)),
            pacing,
            permission,
            stop_tx: None,
            thread_handle: None,
        }
    }

    /// Load a CSV trace and wrap it in a source.
    pub fn from_csv(
        path: impl AsRef<Path>,
        pacing: Pacing,
        permission: PermissionMode,
    ) -> Result<Self, SourceError> {
        Ok(Self::new(load_samples_from_csv(path)?, pacing, permission))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples not yet delivered.
    pub fn remaining(&self) -> usize {
        self.samples
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }
}

impl MotionSource for ReplaySource {
    fn availability(&self) -> Availability {
        match self.permission {
            PermissionMode::Unsupported => Availability::Unsupported,
            PermissionMode::Implicit => Availability::Implicit,
            PermissionMode::Grant | PermissionMode::Deny | PermissionMode::Fail => {
                Availability::RequiresPermission
            }
        }
    }

    fn request_permission(&mut self, reply: PermissionReply) {
        let outcome = match self.permission {
            PermissionMode::Implicit | PermissionMode::Grant => Ok(PermissionState::Granted),
            PermissionMode::Deny => Ok(PermissionState::Denied),
            PermissionMode::Fail => Err("permission request failed".to_string()),
            PermissionMode::Unsupported => Err("motion sensor not supported".to_string()),
        };
        // Answer off-thread, the way a platform prompt would.
        thread::spawn(move || reply.resolve(outcome));
    }

    fn subscribe(&mut self, sink: SampleSink) -> Result<(), SourceError> {
        if self.availability() == Availability::Unsupported {
            return Err(SourceError::Unsupported);
        }
        if self.thread_handle.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }

        let (stop_tx, stop_rx) = bounded(1);
        let samples = self.samples.clone();
        let cursor = self.cursor.clone();
        let pacing = self.pacing;

        let handle = thread::spawn(move || run_replay(samples, cursor, pacing, sink, stop_rx));

        self.stop_tx = Some(stop_tx);
        self.thread_handle = Some(handle);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn is_subscribed(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn run_replay(
    samples: Arc<Vec<AccelerationSample>>,
    cursor: Arc<AtomicUsize>,
    pacing: Pacing,
    sink: SampleSink,
    stop: Receiver<()>,
) {
    let mut previous_ms = None;
    loop {
        let index = cursor.load(Ordering::SeqCst);
        let Some(sample) = samples.get(index).copied() else {
            sink.finish();
            return;
        };

        if !wait(&stop, pacing.delay(previous_ms, sample.timestamp_ms)) {
            return;
        }
        if !sink.send(sample) {
            return;
        }
        cursor.store(index + 1, Ordering::SeqCst);
        previous_ms = Some(sample.timestamp_ms);
    }
}

/// Sleep for `delay` unless stopped first. Returns false when stopped.
fn wait(stop: &Receiver<()>, delay: Duration) -> bool {
    if delay.is_zero() {
        return matches!(stop.try_recv(), Err(TryRecvError::Empty));
    }
    matches!(stop.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
}
