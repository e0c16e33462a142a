//! Concurrency tests: many host threads against one engine.

use std::sync::{Arc, Barrier};
use std::thread;

use beacon_core::config::StorageConfig;
use beacon_core::events::{EventKind, NewEvent};
use beacon_core::traits::{IEventStorage, IKeyValueStorage};
use beacon_storage::StorageEngine;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        db_path: dir.path().join("test.db"),
        read_pool_size: 4,
        ..StorageConfig::default()
    }
}

#[test]
fn concurrent_appends_all_land_with_unique_ids() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StorageEngine::open(&test_config(&dir)).unwrap());

    let threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut ids = Vec::with_capacity(per_thread);
                for i in 0..per_thread {
                    let event = NewEvent {
                        kind: EventKind::Client,
                        timestamp_ms: 1_700_000_000_000 + i as i64,
                        session_id: format!("s{t}"),
                        payload: vec![t as u8; 32],
                    };
                    ids.push(engine.append(event).unwrap());
                }
                ids
            })
        })
        .collect();

    let mut all_ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all_ids.sort_unstable();
    all_ids.dedup();

    assert_eq!(all_ids.len(), threads * per_thread);
    assert_eq!(engine.pending_count().unwrap(), threads * per_thread);
}

#[test]
fn concurrent_increments_do_not_lose_updates() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StorageEngine::open(&test_config(&dir)).unwrap());

    let threads = 8;
    let per_thread = 50i64;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    engine.increment("counter", 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        engine.increment("counter", 0).unwrap(),
        threads as i64 * per_thread
    );
}

#[test]
fn reads_proceed_while_writes_are_running() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StorageEngine::open(&test_config(&dir)).unwrap());

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..100 {
                let event = NewEvent {
                    kind: EventKind::Client,
                    timestamp_ms: 1_700_000_000_000 + i,
                    session_id: "s1".to_string(),
                    payload: vec![0xCD; 64],
                };
                engine.append(event).unwrap();
            }
        })
    };

    // Reads through the pool never error while the writer is busy.
    for _ in 0..200 {
        let count = engine.pending_count().unwrap();
        assert!(count <= 100);
    }
    writer.join().unwrap();
    assert_eq!(engine.pending_count().unwrap(), 100);
}
