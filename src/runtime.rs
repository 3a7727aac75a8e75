//! Session runtime: the single consumer of the event channel.
//!
//! Sources, permission prompts, control input and the duration ticker all
//! produce messages; only the thread driving [`Session`] mutates tracker
//! state. Effects requested by the tracker are carried out here, in order,
//! before the next event is taken.

use crate::collector::{MotionSource, PermissionReply, SampleSink};
use crate::core::{Command, Effect, Event, Snapshot, Tracker, TrackerConfig};
use crate::diagnostics::SharedSessionStats;
use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Period of the duration ticker. Each tick adds one second.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long one poll waits before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the tracker, the motion source and the event channel.
pub struct Session<S: MotionSource> {
    tracker: Tracker,
    source: S,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    ticker: Option<(u64, Receiver<Instant>)>,
    tick_interval: Duration,
}

impl<S: MotionSource> Session<S> {
    pub fn new(source: S, config: TrackerConfig) -> Self {
        let tracker = Tracker::new(config, source.availability());
        Self::from_tracker(source, tracker)
    }

    pub fn with_stats(source: S, config: TrackerConfig, stats: SharedSessionStats) -> Self {
        let tracker = Tracker::with_stats(config, source.availability(), stats);
        Self::from_tracker(source, tracker)
    }

    fn from_tracker(source: S, tracker: Tracker) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            tracker,
            source,
            sender,
            receiver,
            ticker: None,
            tick_interval: TICK_INTERVAL,
        }
    }

    /// Override the ticker period (each tick still counts as one second).
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sender for control input. Commands are applied in arrival order.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> &SharedSessionStats {
        self.tracker.stats()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tracker.snapshot()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Apply a command immediately, bypassing the queue.
    pub fn command(&mut self, command: Command) -> Snapshot {
        self.handle(Event::Command(command))
    }

    /// Apply one event and carry out its effects.
    pub fn handle(&mut self, event: Event) -> Snapshot {
        self.dispatch(event);
        self.tracker.snapshot()
    }

    fn dispatch(&mut self, event: Event) {
        for effect in self.tracker.handle(event) {
            // A failed effect abandons the rest of its batch.
            if let Some(followup) = self.apply(effect) {
                self.dispatch(followup);
                return;
            }
        }
    }

    /// Wait up to `timeout` for the next event or tick and apply it.
    pub fn poll(&mut self, timeout: Duration) -> Option<Snapshot> {
        let (tick_epoch, ticker) = match &self.ticker {
            Some((epoch, rx)) => (*epoch, rx.clone()),
            None => (0, never()),
        };

        // The session holds a sender, so the channel never disconnects.
        let event = select! {
            recv(self.receiver) -> msg => msg.ok(),
            recv(ticker) -> _ => Some(Event::Tick { epoch: tick_epoch }),
            default(timeout) => None,
        };

        event.map(|event| self.handle(event))
    }

    /// Drive the session while `running` is set and `finished` does not hold, then stop.
    ///
    /// `observer` sees the snapshot after every applied event.
    pub fn run<F, O>(&mut self, running: &AtomicBool, finished: F, mut observer: O) -> Snapshot
    where
        F: Fn(&Snapshot) -> bool,
        O: FnMut(&Snapshot),
    {
        observer(&self.snapshot());

        while running.load(Ordering::SeqCst) {
            if let Some(snapshot) = self.poll(POLL_INTERVAL) {
                observer(&snapshot);
                if finished(&snapshot) {
                    break;
                }
            }
        }

        let snapshot = self.command(Command::Stop);
        observer(&snapshot);
        snapshot
    }

    /// Carry out one effect. Returns the event to feed back when it failed.
    fn apply(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::RequestPermission => {
                self.source
                    .request_permission(PermissionReply::new(self.sender.clone()));
            }
            Effect::Subscribe { epoch } => {
                let sink = SampleSink::new(epoch, self.sender.clone());
                if let Err(e) = self.source.subscribe(sink) {
                    tracing::error!("Failed to subscribe to motion source: {}", e);
                    return Some(Event::SourceFailed {
                        epoch,
                        reason: e.to_string(),
                    });
                }
            }
            Effect::Unsubscribe => self.source.unsubscribe(),
            Effect::StartTicker { epoch } => {
                if let Some((previous, _)) = &self.ticker {
                    tracing::warn!(previous, epoch, "replacing an active ticker");
                }
                self.ticker = Some((epoch, tick(self.tick_interval)));
            }
            Effect::StopTicker => {
                self.ticker = None;
            }
        }
        None
    }
}
