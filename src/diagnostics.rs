//! In-memory activity counters for a running agent.
//!
//! These describe what the engine did (samples seen, samples gated out,
//! steps, ticks) so a user can audit it. Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Activity counters for the lifetime of the process.
#[derive(Debug)]
pub struct SessionStats {
    /// Samples that reached the tracker
    samples_received: AtomicU64,
    /// Samples dropped because tracking was idle or the epoch was stale
    samples_discarded: AtomicU64,
    /// Steps registered by the detector
    steps_registered: AtomicU64,
    /// Duration ticks applied to the counters
    ticks_applied: AtomicU64,
    /// Idle to running transitions
    sessions_started: AtomicU64,
    /// Reset commands handled
    resets: AtomicU64,
    /// Permission requests issued
    permission_requests: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            samples_received: AtomicU64::new(0),
            samples_discarded: AtomicU64::new(0),
            steps_registered: AtomicU64::new(0),
            ticks_applied: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            resets: AtomicU64::new(0),
            permission_requests: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_sample_received(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_discarded(&self) {
        self.samples_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_step(&self) {
        self.steps_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permission_request(&self) {
        self.permission_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            steps_registered: self.steps_registered.load(Ordering::Relaxed),
            ticks_applied: self.ticks_applied.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            permission_requests: self.permission_requests.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Activity:\n\
             - Samples received: {}\n\
             - Samples discarded while idle: {}\n\
             - Steps registered (all sessions): {}\n\
             - Duration ticks applied: {}\n\
             - Tracking sessions started: {}\n\
             - Resets: {}\n\
             - Permission requests: {}\n\
             - Uptime: {} seconds",
            stats.samples_received,
            stats.samples_discarded,
            stats.steps_registered,
            stats.ticks_applied,
            stats.sessions_started,
            stats.resets,
            stats.permission_requests,
            stats.uptime_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_received: u64,
    pub samples_discarded: u64,
    pub steps_registered: u64,
    pub ticks_applied: u64,
    pub sessions_started: u64,
    pub resets: u64,
    pub permission_requests: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared stats.
pub type SharedSessionStats = Arc<SessionStats>;

pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counting() {
        let stats = SessionStats::new();

        stats.record_sample_received();
        stats.record_sample_received();
        stats.record_sample_discarded();
        stats.record_step();

        let snapshot = stats.stats();
        assert_eq!(snapshot.samples_received, 2);
        assert_eq!(snapshot.samples_discarded, 1);
        assert_eq!(snapshot.steps_registered, 1);
        assert_eq!(snapshot.ticks_applied, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = SessionStats::new();
        stats.record_permission_request();
        let summary = stats.summary();

        assert!(summary.contains("Samples received: 0"));
        assert!(summary.contains("Permission requests: 1"));
    }
}
