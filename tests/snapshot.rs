mod support;

use std::sync::Arc;

use jvmti_stacks::diagnostics::{CountingSink, SkipReason};
use jvmti_stacks::snapshot::{AllStacksSnapshot, MAX_FRAMES};
use jvmti_stacks::sys::jvmti::*;
use jvmti_stacks::thread_state::{JvmtiThreadStates, ThreadStatus};
use jvmti_stacks::SamplingSession;
use support::{thread_handle, FakeRuntime, RecordingSink};

const ALIVE: i32 = JVMTI_THREAD_STATE_ALIVE;

fn runtime() -> FakeRuntime {
    FakeRuntime::new()
        .thread(1, ALIVE | JVMTI_THREAD_STATE_RUNNABLE, &[0x11, 0x12, 0x13])
        .thread(2, ALIVE | JVMTI_THREAD_STATE_WAITING | JVMTI_THREAD_STATE_SLEEPING, &[0x21])
        .thread(3, ALIVE | JVMTI_THREAD_STATE_BLOCKED_ON_MONITOR_ENTER, &[])
        .thread(4, JVMTI_THREAD_STATE_TERMINATED, &[0x41, 0x42])
}

#[test]
fn sequences_stay_index_aligned() {
    // each thread's state encodes its own number
    let runtime = FakeRuntime::new()
        .thread(10, 10, &[0x1000])
        .thread(20, 20, &[0x2000, 0x2001])
        .thread(30, 30, &[0x3000, 0x3001, 0x3002]);
    let session = SamplingSession::new(runtime).with_state_mapper(Arc::new(|state: i32| state));

    let snapshot = session.capture_all_stacks();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.states.len(), 3);
    assert_eq!(snapshot.frames.len(), 3);
    for (thread, state, frames) in snapshot.iter() {
        assert_eq!(thread, thread_handle(state as usize));
        assert_eq!(frames.len(), state as usize / 10);
        assert!(frames.iter().all(|&id| id / 0x1000 == state as i64 / 10));
    }
}

#[test]
fn default_mapper_produces_thread_status_codes() {
    let session = SamplingSession::new(runtime());
    let snapshot = session.capture_all_stacks();

    assert_eq!(
        snapshot.threads,
        vec![thread_handle(1), thread_handle(2), thread_handle(3), thread_handle(4)]
    );
    assert_eq!(
        snapshot.states,
        vec![
            ThreadStatus::Running.code(),
            ThreadStatus::Sleeping.code(),
            ThreadStatus::Monitor.code(),
            ThreadStatus::Zombie.code(),
        ]
    );
    assert_eq!(snapshot.frames, vec![vec![0x11, 0x12, 0x13], vec![0x21], vec![], vec![0x41, 0x42]]);
}

#[test]
fn every_capture_releases_exactly_once() {
    let session = SamplingSession::new(runtime());
    assert_eq!(session.runtime().releases(), 0);

    for round in 1..=3 {
        let snapshot = session.capture_all_stacks();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(session.runtime().releases(), round);
    }
}

#[test]
fn failed_capture_is_empty_and_reported() {
    let sink = Arc::new(CountingSink::new());
    let session = SamplingSession::new(runtime().failing_snapshots()).with_sink(sink.clone());

    let snapshot = session.capture_all_stacks();
    assert!(snapshot.is_empty());
    assert!(snapshot.states.is_empty());
    assert!(snapshot.frames.is_empty());
    assert_eq!(session.runtime().releases(), 0);
    assert_eq!(sink.skips(SkipReason::SnapshotFailed), 1);
}

#[test]
fn failed_capture_is_reported_once_with_its_cause() {
    let sink = Arc::new(RecordingSink::default());
    let session = SamplingSession::new(runtime().failing_snapshots()).with_sink(sink.clone());

    assert!(session.capture_all_stacks().is_empty());
    assert_eq!(
        sink.skips(),
        vec![(
            SkipReason::SnapshotFailed,
            Some("GetAllStackTraces failed: JVMTI_ERROR_WRONG_PHASE".to_owned())
        )]
    );
}

#[test]
fn depth_bound_truncates_each_stack() {
    let session = SamplingSession::new(runtime()).with_max_frames(1);
    let snapshot = session.capture_all_stacks();
    assert_eq!(snapshot.frames, vec![vec![0x11], vec![0x21], vec![], vec![0x41]]);
}

#[test]
fn no_threads_no_entries() {
    let runtime = FakeRuntime::new();
    let sink = CountingSink::new();
    let snapshot = AllStacksSnapshot::default().capture(&runtime, &JvmtiThreadStates, &sink);
    assert!(snapshot.is_empty());
    assert_eq!(runtime.releases(), 1);
    assert_eq!(AllStacksSnapshot::default().max_frames(), MAX_FRAMES);
}
