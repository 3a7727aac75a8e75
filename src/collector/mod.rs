//! Motion sample sources.
//!
//! A source delivers samples into the session's event channel through a
//! [`SampleSink`] and answers permission requests through a
//! [`PermissionReply`]. Both are plain message senders, so everything a
//! source produces is applied on the session thread.

pub mod noop;
pub mod replay;
pub mod types;

use crate::core::Event;
use crossbeam_channel::Sender;
use thiserror::Error;

pub use noop::UnsupportedSource;
pub use replay::{load_samples_from_csv, Pacing, PermissionMode, ReplaySource};
pub use types::{AccelerationSample, Availability, PermissionState};

/// Errors raised by motion sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Motion source is already subscribed")]
    AlreadySubscribed,

    #[error("Motion sensor not supported on this platform")]
    Unsupported,

    #[error("Could not read replay file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid replay data: {0}")]
    Parse(String),

    #[error("Replay file contains no samples")]
    Empty,
}

/// A platform (or simulated) accelerometer.
pub trait MotionSource: Send {
    /// How samples can be obtained on this platform.
    fn availability(&self) -> Availability;

    /// Ask for sensor access. The answer must be delivered through `reply`,
    /// typically from another thread.
    fn request_permission(&mut self, reply: PermissionReply);

    /// Begin delivering samples into `sink`.
    fn subscribe(&mut self, sink: SampleSink) -> Result<(), SourceError>;

    /// Stop delivering samples. When this returns no further samples are sent.
    fn unsubscribe(&mut self);

    fn is_subscribed(&self) -> bool;
}

/// Sending half handed to a source on subscribe.
///
/// Every sample is tagged with the epoch of the subscription it belongs to.
#[derive(Debug, Clone)]
pub struct SampleSink {
    epoch: u64,
    sender: Sender<Event>,
}

impl SampleSink {
    pub fn new(epoch: u64, sender: Sender<Event>) -> Self {
        Self { epoch, sender }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Deliver one sample. Returns false once the session is gone.
    pub fn send(&self, sample: AccelerationSample) -> bool {
        self.sender
            .send(Event::Sample {
                epoch: self.epoch,
                sample,
            })
            .is_ok()
    }

    /// Signal that the source has no more samples to deliver.
    pub fn finish(&self) -> bool {
        self.sender
            .send(Event::SourceExhausted { epoch: self.epoch })
            .is_ok()
    }
}

/// One-shot reply channel for a permission request.
#[derive(Debug)]
pub struct PermissionReply {
    sender: Sender<Event>,
}

impl PermissionReply {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }

    /// Deliver the outcome. An `Err` means the request itself failed.
    pub fn resolve(self, outcome: Result<PermissionState, String>) {
        let _ = self.sender.send(Event::PermissionResolved(outcome));
    }
}
