//! Sample and permission types exchanged with motion sources.
//!
//! Only the vertical axis is carried. Samples are consumed immediately and
//! never stored beyond the single previous value the detector keeps.

use serde::{Deserialize, Serialize};

/// One accelerometer reading, vertical axis including gravity (m/s²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    /// Vertical acceleration including gravity
    pub z: f64,
    /// Device timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl AccelerationSample {
    pub fn new(z: f64, timestamp_ms: i64) -> Self {
        Self { z, timestamp_ms }
    }
}

/// Whether a platform can deliver motion samples at all, and how access is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// No motion capability on this platform
    Unsupported,
    /// Samples are available without asking
    Implicit,
    /// An explicit permission request must be granted first
    RequiresPermission,
}

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_creation() {
        let sample = AccelerationSample::new(9.81, 1_000);
        assert_eq!(sample.z, 9.81);
        assert_eq!(sample.timestamp_ms, 1_000);
    }

    #[test]
    fn test_availability_serializes_snake_case() {
        let json = serde_json::to_string(&Availability::RequiresPermission).unwrap();
        assert_eq!(json, "\"requires_permission\"");
    }
}
