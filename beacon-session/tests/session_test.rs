//! Session boundary tests against the real storage engine.

use std::sync::Arc;

use beacon_core::config::{SessionConfig, StorageConfig};
use beacon_core::models::AppInfo;
use beacon_core::traits::ISessionStorage;
use beacon_session::SessionTracker;
use beacon_storage::StorageEngine;
use tempfile::TempDir;

const GAP_MS: i64 = 10_000;
const T0: i64 = 1_700_000_000_000;

fn open_engine(dir: &TempDir) -> Arc<StorageEngine> {
    let config = StorageConfig {
        db_path: dir.path().join("test.db"),
        read_pool_size: 2,
        ..StorageConfig::default()
    };
    Arc::new(StorageEngine::open(&config).unwrap())
}

fn tracker(engine: &Arc<StorageEngine>) -> SessionTracker {
    let config = SessionConfig {
        inactivity_gap_ms: GAP_MS,
    };
    let app = AppInfo {
        app_version: "1.2.3".to_string(),
        os_name: "ios".to_string(),
        ..AppInfo::default()
    };
    SessionTracker::new(engine.clone() as Arc<dyn ISessionStorage>, &config, app).unwrap()
}

// ---- boundaries ----

#[test]
fn events_within_gap_share_a_session() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);

    let first = tracker.session_for(T0).unwrap();
    assert!(first.started_new);

    let second = tracker.session_for(T0 + GAP_MS).unwrap();
    assert!(!second.started_new);
    assert_eq!(second.session_id, first.session_id);
}

#[test]
fn event_beyond_gap_opens_new_session_and_closes_old() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);

    let first = tracker.session_for(T0).unwrap();
    tracker.session_for(T0 + 1_000).unwrap();

    let third = tracker.session_for(T0 + 1_000 + GAP_MS + 1).unwrap();
    assert!(third.started_new);
    assert_ne!(third.session_id, first.session_id);

    // The old session ended at its last event, not at the new event.
    let latest = engine.latest_session().unwrap().unwrap();
    assert_eq!(latest.id, third.session_id);
    assert!(latest.is_open());
}

#[test]
fn out_of_order_timestamps_do_not_regress_the_session_clock() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);

    let first = tracker.session_for(T0).unwrap();
    tracker.session_for(T0 + 5_000).unwrap();
    // A delayed event with an older stamp still lands in the session.
    let delayed = tracker.session_for(T0 + 1_000).unwrap();
    assert!(!delayed.started_new);
    assert_eq!(delayed.session_id, first.session_id);

    // The session clock stayed at the newest event, so the gap is
    // still measured from T0+5000.
    let next = tracker.session_for(T0 + 5_000 + GAP_MS).unwrap();
    assert!(!next.started_new);
}

#[test]
fn session_snapshot_carries_app_info() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);

    tracker.session_for(T0).unwrap();
    let session = engine.latest_session().unwrap().unwrap();
    assert_eq!(session.app.app_version, "1.2.3");
    assert_eq!(session.app.os_name, "ios");
}

// ---- explicit close ----

#[test]
fn close_current_ends_the_session() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);

    let first = tracker.session_for(T0).unwrap();
    let closed = tracker.close_current(T0 + 2_000).unwrap();
    assert_eq!(closed, Some(first.session_id));
    assert_eq!(tracker.current_session_id().unwrap(), None);

    let session = engine.latest_session().unwrap().unwrap();
    assert_eq!(session.ended_at_ms, Some(T0 + 2_000));

    // The next event starts fresh even inside the gap.
    let next = tracker.session_for(T0 + 3_000).unwrap();
    assert!(next.started_new);
}

#[test]
fn close_without_session_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let tracker = tracker(&engine);
    assert_eq!(tracker.close_current(T0).unwrap(), None);
}

// ---- restart continuity ----

#[test]
fn open_session_resumes_across_tracker_restarts() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);

    let first_id = {
        let tracker = tracker(&engine);
        tracker.session_for(T0).unwrap().session_id
    };

    // New tracker over the same storage: within the gap the session
    // continues, beyond it a new one starts.
    let tracker = tracker(&engine);
    let resumed = tracker.session_for(T0 + GAP_MS / 2).unwrap();
    assert!(!resumed.started_new);
    assert_eq!(resumed.session_id, first_id);

    let later = tracker.session_for(T0 + GAP_MS / 2 + GAP_MS + 1).unwrap();
    assert!(later.started_new);
    assert_ne!(later.session_id, first_id);
}
