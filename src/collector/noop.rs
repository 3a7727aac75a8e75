//! Source for platforms without a motion sensor.
//!
//! Lets the session run (and report "not supported") where no accelerometer
//! exists.

use crate::collector::{Availability, MotionSource, PermissionReply, SampleSink, SourceError};

/// A source that never emits samples.
#[derive(Debug, Default)]
pub struct UnsupportedSource;

impl UnsupportedSource {
    pub fn new() -> Self {
        Self
    }
}

impl MotionSource for UnsupportedSource {
    fn availability(&self) -> Availability {
        Availability::Unsupported
    }

    fn request_permission(&mut self, reply: PermissionReply) {
        reply.resolve(Err("motion sensor not supported".to_string()));
    }

    fn subscribe(&mut self, _sink: SampleSink) -> Result<(), SourceError> {
        Err(SourceError::Unsupported)
    }

    fn unsubscribe(&mut self) {}

    fn is_subscribed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_unsupported_source_refuses_subscription() {
        let (tx, _rx) = unbounded();
        let mut source = UnsupportedSource::new();
        assert_eq!(source.availability(), Availability::Unsupported);
        assert!(matches!(
            source.subscribe(SampleSink::new(1, tx)),
            Err(SourceError::Unsupported)
        ));
        assert!(!source.is_subscribed());
    }
}
