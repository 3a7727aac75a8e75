//! Integration tests driving a full session from a replayed trace file

use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use stride_agent::{
    Command, Config, Pacing, PermissionMode, ReplaySource, SensorAccess, Session, Snapshot,
    TrackingState, UnsupportedSource,
};

const WALK: &str = "timestamp_ms,x,y,z
0,0.1,0.3,9.81
40,0.1,0.3,9.90
520,0.2,0.2,11.60
560,0.2,0.2,11.20
1040,0.1,0.3,9.40
1080,0.1,0.3,9.70
1560,0.2,0.1,11.80
2080,0.1,0.2,9.30
2600,0.2,0.2,11.70
";

fn write_trace(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write trace");
    file
}

fn session_for(trace: &tempfile::NamedTempFile, permission: PermissionMode) -> Session<ReplaySource> {
    let source = ReplaySource::from_csv(trace.path(), Pacing::Immediate, permission)
        .expect("Failed to load trace");
    Session::new(source, Config::default().tracker_config())
}

fn poll_until(session: &mut Session<ReplaySource>, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = session.snapshot();
        if done(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out waiting for session");
        session.poll(Duration::from_millis(20));
    }
}

#[test]
fn test_full_walk_from_csv() {
    let trace = write_trace(WALK);
    let mut session = session_for(&trace, PermissionMode::Implicit);

    session.command(Command::Toggle);
    let snapshot = poll_until(&mut session, |s| s.source_exhausted);

    // Steps at 520, 1040, 1560, 2080 and 2600; the 40 ms jitter rows stay below threshold.
    assert_eq!(snapshot.step_count, 5);
    assert_eq!(snapshot.distance_km, 5.0 * 0.76 / 1000.0);
    assert_eq!(snapshot.distance_text, "0.00");
    assert_eq!(snapshot.state, TrackingState::Running);
    assert!(snapshot.session_id.is_some());
}

#[test]
fn test_start_walk_stop_reset() {
    let trace = write_trace(WALK);
    let mut session = session_for(&trace, PermissionMode::Implicit);

    session.command(Command::Toggle);
    poll_until(&mut session, |s| s.source_exhausted);

    let paused = session.command(Command::Toggle);
    assert_eq!(paused.status, "Tracking paused. Total steps: 5.");
    assert_eq!(paused.start_label, "Start Tracking");

    let reset = session.command(Command::Reset);
    assert_eq!(reset.state, TrackingState::Idle);
    assert_eq!(reset.step_count, 0);
    assert_eq!(reset.duration_seconds, 0);
    assert_eq!(reset.distance_text, "0.00");
    assert_eq!(reset.duration_text, "00:00:00");
    assert_eq!(reset.status, "Counter reset. Press 'Start' to begin tracking.");
    assert_eq!(reset.session_id, None);

    let again = session.command(Command::Reset);
    assert_eq!(again, reset);
}

#[test]
fn test_failed_permission_request_can_be_retried() {
    let trace = write_trace(WALK);
    let mut session = session_for(&trace, PermissionMode::Fail);

    session.command(Command::Toggle);
    let failed = poll_until(&mut session, |s| !s.awaiting_permission);
    assert_eq!(failed.access, SensorAccess::Unresolved);
    assert_eq!(failed.status, "Error requesting motion permission.");
    assert!(failed.start_enabled);
    assert!(failed.error.is_some());

    let retry = session.command(Command::Toggle);
    assert!(retry.awaiting_permission);
    assert_eq!(session.stats().stats().permission_requests, 2);
}

#[test]
fn test_unsupported_platform_reports_and_never_counts() {
    let trace = write_trace(WALK);
    let mut session = session_for(&trace, PermissionMode::Unsupported);

    let snapshot = session.command(Command::Toggle);

    assert!(snapshot.not_supported);
    assert!(!snapshot.start_enabled);
    assert_eq!(snapshot.status, "Motion sensor not supported.");
    assert!(session.poll(Duration::from_millis(50)).is_none());
    assert_eq!(session.snapshot().step_count, 0);
}

#[test]
fn test_session_without_motion_sensor() {
    let mut session = Session::new(UnsupportedSource::new(), Config::default().tracker_config());

    let snapshot = session.command(Command::Toggle);
    assert_eq!(snapshot.access, SensorAccess::Unsupported);
    assert!(snapshot.not_supported);
    assert!(!snapshot.start_enabled);
    assert!(!session.is_ticking());

    // Further toggles stay refused and never reach the source.
    let again = session.command(Command::Toggle);
    assert_eq!(again.state, TrackingState::Idle);
    assert_eq!(again.status, "Motion sensor not supported.");
    assert_eq!(session.stats().stats().sessions_started, 0);
    assert!(session.poll(Duration::from_millis(50)).is_none());
}

#[test]
fn test_run_loop_exits_when_trace_is_exhausted() {
    let trace = write_trace(WALK);
    let mut session = session_for(&trace, PermissionMode::Grant);
    session
        .sender()
        .send(stride_agent::Event::Command(Command::Toggle))
        .expect("Failed to queue toggle");

    let running = AtomicBool::new(true);
    let mut seen = Vec::new();
    let last = session.run(&running, |s| s.source_exhausted, |s| seen.push(s.step_count));

    assert_eq!(last.step_count, 5);
    assert_eq!(last.state, TrackingState::Idle);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.first(), Some(&0));
}
