//! Startup recovery tests: unreadable files, malformed rows, schema
//! tampering, stale in-flight claims.

use std::fs;

use beacon_core::config::StorageConfig;
use beacon_core::events::{EventKind, NewEvent};
use beacon_core::models::{AppInfo, AttributeValue, SessionRecord, StoreHealth};
use beacon_core::traits::{IEventStorage, IKeyValueStorage, ISessionStorage};
use beacon_storage::StorageEngine;
use rusqlite::Connection;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        db_path: dir.path().join("test.db"),
        read_pool_size: 2,
        ..StorageConfig::default()
    }
}

fn seed_session(engine: &StorageEngine, id: &str) {
    engine
        .open_session(&SessionRecord {
            id: id.to_string(),
            started_at_ms: 1_700_000_000_000,
            last_event_at_ms: 1_700_000_000_000,
            ended_at_ms: None,
            app: AppInfo::default(),
        })
        .unwrap();
}

fn client_event(session: &str, payload_len: usize) -> NewEvent {
    NewEvent {
        kind: EventKind::Client,
        timestamp_ms: 1_700_000_000_000,
        session_id: session.to_string(),
        payload: vec![0xAB; payload_len],
    }
}

// ---- unreadable file ----

#[test]
fn garbage_file_is_recreated() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    fs::write(&config.db_path, b"this is not a sqlite database at all")
        .unwrap();

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Recreated);

    // Store is usable after the rebuild.
    seed_session(&engine, "s1");
    engine.append(client_event("s1", 16)).unwrap();
    assert_eq!(engine.pending_count().unwrap(), 1);
}

#[test]
fn fresh_open_is_healthy() {
    let dir = TempDir::new().unwrap();
    let engine = StorageEngine::open(&test_config(&dir)).unwrap();
    assert_eq!(engine.health(), StoreHealth::Healthy);
}

// ---- malformed rows ----

#[test]
fn one_corrupt_kv_row_among_ten_is_dropped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        for i in 0..10 {
            engine
                .put(&format!("key{i}"), &AttributeValue::Counter(i))
                .unwrap();
        }
        engine.close().unwrap();
    }

    // Damage one row behind the engine's back.
    {
        let conn = Connection::open(&config.db_path).unwrap();
        conn.execute(
            "UPDATE kv SET value = 'not json' WHERE key = 'key3'",
            [],
        )
        .unwrap();
    }

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Repaired { dropped_rows: 1 });
    assert_eq!(engine.get("key3").unwrap(), None);
    for i in [0i64, 1, 2, 4, 5, 6, 7, 8, 9] {
        assert_eq!(
            engine.get(&format!("key{i}")).unwrap(),
            Some(AttributeValue::Counter(i))
        );
    }
}

#[test]
fn event_rows_with_inconsistent_size_are_dropped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        seed_session(&engine, "s1");
        for _ in 0..3 {
            engine.append(client_event("s1", 16)).unwrap();
        }
        engine.close().unwrap();
    }

    {
        let conn = Connection::open(&config.db_path).unwrap();
        conn.execute("UPDATE events SET size = size + 5 WHERE id = 2", [])
            .unwrap();
    }

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Repaired { dropped_rows: 1 });
    assert_eq!(engine.pending_count().unwrap(), 2);
}

#[test]
fn events_orphaned_by_a_missing_session_are_dropped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        seed_session(&engine, "s1");
        seed_session(&engine, "s2");
        engine.append(client_event("s1", 16)).unwrap();
        engine.append(client_event("s1", 16)).unwrap();
        engine.append(client_event("s2", 16)).unwrap();
        engine.close().unwrap();
    }

    // Remove a session behind the engine's back, orphaning its events.
    {
        let conn = Connection::open(&config.db_path).unwrap();
        conn.execute("DELETE FROM sessions WHERE id = 's1'", [])
            .unwrap();
    }

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Repaired { dropped_rows: 2 });

    // The other session's event survived intact.
    assert_eq!(engine.pending_count().unwrap(), 1);
    let batch = engine.claim_batch(10, u64::MAX).unwrap();
    assert_eq!(batch.ids(), vec![3]);
    assert_eq!(batch.events[0].session_id, "s2");
}

#[test]
fn malformed_session_row_takes_its_events_with_it() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        seed_session(&engine, "s1");
        engine
            .open_session(&SessionRecord {
                id: "s2".to_string(),
                started_at_ms: 1_700_000_001_000,
                last_event_at_ms: 1_700_000_001_000,
                ended_at_ms: None,
                app: AppInfo::default(),
            })
            .unwrap();
        engine.append(client_event("s1", 16)).unwrap();
        engine.append(client_event("s1", 16)).unwrap();
        engine.append(client_event("s2", 16)).unwrap();
        engine.append(client_event("s2", 16)).unwrap();
        engine.close().unwrap();
    }

    {
        let conn = Connection::open(&config.db_path).unwrap();
        conn.execute(
            "UPDATE sessions SET app_info = 'not json' WHERE id = 's1'",
            [],
        )
        .unwrap();
    }

    // One bad session row plus its two orphaned events.
    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Repaired { dropped_rows: 3 });

    assert_eq!(engine.pending_count().unwrap(), 2);
    let batch = engine.claim_batch(10, u64::MAX).unwrap();
    assert_eq!(batch.ids(), vec![3, 4]);
    assert!(batch.events.iter().all(|e| e.session_id == "s2"));

    let latest = engine.latest_session().unwrap().unwrap();
    assert_eq!(latest.id, "s2");
}

// ---- schema tampering ----

#[test]
fn dropped_table_triggers_recreate() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        engine.put("k", &AttributeValue::Bool(true)).unwrap();
        engine.close().unwrap();
    }

    {
        let conn = Connection::open(&config.db_path).unwrap();
        conn.execute_batch("DROP TABLE kv;").unwrap();
    }

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.health(), StoreHealth::Recreated);
    // Everything was wiped, but the store works.
    assert_eq!(engine.get("k").unwrap(), None);
    assert_eq!(engine.pending_count().unwrap(), 0);
}

// ---- stale in-flight claims ----

#[test]
fn stale_in_flight_rows_return_to_pending_without_attempt_increment() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let engine = StorageEngine::open(&config).unwrap();
        seed_session(&engine, "s1");
        for _ in 0..3 {
            engine.append(client_event("s1", 16)).unwrap();
        }
        let batch = engine.claim_batch(2, u64::MAX).unwrap();
        assert_eq!(batch.len(), 2);
        // Simulated crash: the engine goes away without acknowledge
        // or release.
        drop(engine);
    }

    let engine = StorageEngine::open(&config).unwrap();
    // Stale claims are not corruption.
    assert_eq!(engine.health(), StoreHealth::Healthy);
    assert_eq!(engine.pending_count().unwrap(), 3);

    // The interrupted send does not count as an attempt.
    let batch = engine.claim_batch(10, u64::MAX).unwrap();
    assert!(batch.events.iter().all(|e| e.attempt_count == 0));
}
