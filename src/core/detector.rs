//! Threshold and debounce step detection on vertical acceleration.
//!
//! A step is registered when the change in `z` since the previous sample
//! exceeds a fixed threshold and enough time has passed since the last
//! registered step. There is no smoothing and no look-ahead: jitter is
//! suppressed only by the amplitude threshold and the debounce window.

use crate::collector::AccelerationSample;
use serde::{Deserialize, Serialize};

/// Minimum |Δz| between consecutive samples to count as a step (m/s²).
pub const ACCELERATION_THRESHOLD: f64 = 1.25;

/// Minimum time between two registered steps in milliseconds.
pub const STEP_DEBOUNCE_MS: i64 = 200;

/// Configuration for step detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum |Δz| to count as a step (m/s²)
    pub acceleration_threshold: f64,
    /// Minimum time between steps in milliseconds
    pub step_debounce_ms: i64,
    /// Use the first sample after (re)initialization only as the reference value.
    /// When false the first delta is measured against zero.
    pub prime_first_sample: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: ACCELERATION_THRESHOLD,
            step_debounce_ms: STEP_DEBOUNCE_MS,
            prime_first_sample: true,
        }
    }
}

/// Mutable detector state. Zeroed as a unit on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DetectorState {
    /// Previous sample's `z`, `None` until the first sample arrives
    pub last_z: Option<f64>,
    /// Timestamp of the last registered step, `None` before the first one
    pub last_step_timestamp_ms: Option<i64>,
}

/// Single-pass step detector.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: DetectorConfig,
    state: DetectorState,
}

impl StepDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::default(),
        }
    }

    /// Feed one sample. Returns true when it registers a step.
    pub fn process_sample(&mut self, sample: &AccelerationSample) -> bool {
        let reference = match self.state.last_z {
            Some(z) => Some(z),
            None if self.config.prime_first_sample => None,
            None => Some(0.0),
        };

        let is_step = reference.is_some_and(|last_z| {
            (sample.z - last_z).abs() > self.config.acceleration_threshold
                && self.debounce_elapsed(sample.timestamp_ms)
        });

        if is_step {
            self.state.last_step_timestamp_ms = Some(sample.timestamp_ms);
        }
        self.state.last_z = Some(sample.z);

        is_step
    }

    /// Count the steps in a batch of samples.
    pub fn process_batch(&mut self, samples: &[AccelerationSample]) -> u64 {
        samples
            .iter()
            .filter(|sample| self.process_sample(sample))
            .count() as u64
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Forget the reference value and the last step time.
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
    }

    fn debounce_elapsed(&self, timestamp_ms: i64) -> bool {
        match self.state.last_step_timestamp_ms {
            Some(last) => timestamp_ms.saturating_sub(last) > self.config.step_debounce_ms,
            None => true,
        }
    }
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(points: &[(f64, i64)]) -> Vec<AccelerationSample> {
        points
            .iter()
            .map(|&(z, t)| AccelerationSample::new(z, t))
            .collect()
    }

    #[test]
    fn test_first_sample_only_primes() {
        let mut detector = StepDetector::default();
        assert!(!detector.process_sample(&AccelerationSample::new(9.81, 0)));
        assert_eq!(detector.state().last_z, Some(9.81));
        assert_eq!(detector.state().last_step_timestamp_ms, None);
    }

    #[test]
    fn test_unprimed_first_sample_measures_against_zero() {
        let mut detector = StepDetector::new(DetectorConfig {
            prime_first_sample: false,
            ..DetectorConfig::default()
        });
        assert!(detector.process_sample(&AccelerationSample::new(9.81, 0)));
    }

    #[test]
    fn test_walkthrough_registers_two_steps() {
        let mut detector = StepDetector::default();
        let trace = samples(&[(0.0, 0), (2.0, 50), (0.5, 300)]);

        let flags: Vec<bool> = trace.iter().map(|s| detector.process_sample(s)).collect();
        assert_eq!(flags, vec![false, true, true]);
        assert_eq!(detector.state().last_step_timestamp_ms, Some(300));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut detector = StepDetector::default();
        detector.process_sample(&AccelerationSample::new(9.0, 0));
        assert!(!detector.process_sample(&AccelerationSample::new(10.25, 1_000)));
        assert!(detector.process_sample(&AccelerationSample::new(8.99, 2_000)));
    }

    #[test]
    fn test_debounce_suppresses_fast_retrigger() {
        let mut detector = StepDetector::default();
        let trace = samples(&[(9.8, 0), (12.0, 1_000), (9.0, 1_150), (12.0, 1_200), (9.0, 1_201)]);

        assert_eq!(detector.process_batch(&trace), 2);
        assert_eq!(detector.state().last_step_timestamp_ms, Some(1_201));
    }

    #[test]
    fn test_debounce_boundary_is_exclusive() {
        let mut detector = StepDetector::default();
        detector.process_batch(&samples(&[(9.8, 0), (12.0, 1_000)]));
        assert!(!detector.process_sample(&AccelerationSample::new(9.0, 1_200)));
        assert!(detector.process_sample(&AccelerationSample::new(12.0, 1_201)));
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut detector = StepDetector::default();
        let trace = samples(&[
            (9.8, i64::MAX - 10),
            (12.0, i64::MAX - 5),
            (9.0, i64::MIN + 5),
        ]);

        // The backwards jump saturates and stays inside the debounce window.
        assert_eq!(detector.process_batch(&trace), 1);
        assert_eq!(detector.state().last_step_timestamp_ms, Some(i64::MAX - 5));
    }

    #[test]
    fn test_reference_updates_even_when_debounced() {
        let mut detector = StepDetector::default();
        detector.process_batch(&samples(&[(9.8, 0), (12.0, 1_000)]));

        // Debounced, but becomes the new reference.
        assert!(!detector.process_sample(&AccelerationSample::new(5.0, 1_050)));
        assert_eq!(detector.state().last_z, Some(5.0));

        // Small delta against 5.0, so no step despite the debounce having elapsed.
        assert!(!detector.process_sample(&AccelerationSample::new(5.5, 2_000)));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut detector = StepDetector::default();
        detector.process_batch(&samples(&[(9.8, 0), (12.0, 1_000)]));

        detector.reset();

        assert_eq!(detector.state(), DetectorState::default());
        assert!(!detector.process_sample(&AccelerationSample::new(20.0, 1_100)));
    }
}
