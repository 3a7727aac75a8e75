//! Session counters and their display formatting.

use serde::{Deserialize, Serialize};

/// Average adult step length in meters.
pub const STEP_LENGTH_M: f64 = 0.76;

/// Step count and elapsed tracking time for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub step_count: u64,
    pub duration_seconds: u64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self) {
        self.step_count += 1;
    }

    /// Apply one ticker period.
    pub fn tick(&mut self) {
        self.duration_seconds += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Walking distance in kilometers for the given step length.
    pub fn distance_km(&self, step_length_m: f64) -> f64 {
        distance_km(self.step_count, step_length_m)
    }
}

/// Distance covered by `step_count` steps, in kilometers.
pub fn distance_km(step_count: u64, step_length_m: f64) -> f64 {
    (step_count as f64 * step_length_m) / 1000.0
}

/// Format seconds as `HH:MM:SS`. Hours keep growing past 99.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format a distance with two decimals.
pub fn format_distance(km: f64) -> String {
    format!("{km:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_pure_function_of_steps() {
        for steps in [0u64, 1, 5, 1_000, 123_456] {
            let counters = SessionCounters {
                step_count: steps,
                duration_seconds: 42,
            };
            assert_eq!(
                counters.distance_km(STEP_LENGTH_M),
                steps as f64 * 0.76 / 1000.0
            );
        }
    }

    #[test]
    fn test_record_and_reset() {
        let mut counters = SessionCounters::new();
        counters.record_step();
        counters.record_step();
        counters.tick();
        assert_eq!(counters.step_count, 2);
        assert_eq!(counters.duration_seconds, 1);

        counters.reset();
        assert_eq!(counters, SessionCounters::default());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3_661), "01:01:01");
        assert_eq!(format_duration(360_000), "100:00:00");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0.00");
        assert_eq!(format_distance(distance_km(1_000, STEP_LENGTH_M)), "0.76");
        assert_eq!(format_distance(distance_km(10_000, STEP_LENGTH_M)), "7.60");
    }
}
