//! Dispatcher integration tests: real store, scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use beacon_core::config::{DispatchConfig, StorageConfig};
use beacon_core::errors::NetworkError;
use beacon_core::events::{EventKind, NewEvent};
use beacon_core::models::{AppInfo, DeliveryStatus};
use beacon_core::traits::{
    IDeliveryListener, IEventStorage, ITransport, SystemClock, TransportResponse,
};
use beacon_dispatch::Dispatcher;
use beacon_net::{EnvelopeContext, Reporter, ReportEnvelope};
use beacon_storage::StorageEngine;
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;

/// Replays canned responses, then keeps answering 200. Records every
/// request body it sees.
struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, NetworkError>>>,
    requests: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedTransport {
    fn new(statuses: &[u16]) -> Arc<Self> {
        let responses = statuses
            .iter()
            .map(|&status| {
                Ok(TransportResponse {
                    status,
                    body: Vec::new(),
                })
            })
            .collect();
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn delivered_ids(&self) -> Vec<i64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|body| {
                ReportEnvelope::decode(body)
                    .unwrap()
                    .events
                    .iter()
                    .map(|e| e.id)
                    .collect::<Vec<i64>>()
            })
            .collect()
    }
}

impl ITransport for ScriptedTransport {
    fn post(&self, _url: &str, body: &[u8]) -> Result<TransportResponse, NetworkError> {
        self.requests.lock().unwrap().push(body.to_vec());
        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(
            TransportResponse {
                status: 200,
                body: Vec::new(),
            },
        ))
    }
}

/// Collects every status notification in arrival order.
#[derive(Default)]
struct CollectingListener {
    statuses: Mutex<Vec<DeliveryStatus>>,
}

impl CollectingListener {
    fn statuses(&self) -> Vec<DeliveryStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl IDeliveryListener for CollectingListener {
    fn on_delivery(&self, status: &DeliveryStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }
}

fn open_engine(dir: &TempDir) -> Arc<StorageEngine> {
    let config = StorageConfig {
        db_path: dir.path().join("dispatch.db"),
        read_pool_size: 2,
        ..StorageConfig::default()
    };
    Arc::new(StorageEngine::open(&config).unwrap())
}

fn reporter_for(transport: Arc<ScriptedTransport>) -> Reporter {
    let context = EnvelopeContext {
        api_key: "key-123".to_string(),
        install_id: "install-abc".to_string(),
        app: AppInfo::default(),
    };
    Reporter::new(
        transport,
        "https://collector.example/report".to_string(),
        context,
        Arc::new(SystemClock),
    )
}

fn append_events(engine: &StorageEngine, count: usize) {
    for i in 0..count {
        engine
            .append(NewEvent {
                kind: EventKind::Client,
                timestamp_ms: T0 + i as i64,
                session_id: "session-1".to_string(),
                payload: vec![0x42; 24],
            })
            .unwrap();
    }
}

fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

// ---- happy path ----

#[test]
fn delivers_host_thread_events_in_order() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[]);
    let config = DispatchConfig {
        flush_interval_ms: 25,
        batch_max_events: 2,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);
    let listener = Arc::new(CollectingListener::default());
    dispatcher.on_delivery_status(listener.clone());

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|t| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..3 {
                    engine
                        .append(NewEvent {
                            kind: EventKind::Client,
                            timestamp_ms: T0 + (t * 10 + i) as i64,
                            session_id: "session-1".to_string(),
                            payload: vec![t as u8; 16],
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0 && transport.delivered_ids().len() == 6
    }));
    let stats = dispatcher.shutdown();

    let ids = transport.delivered_ids();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "delivery order follows queue order");
    assert_eq!(ids.len(), 6);

    assert_eq!(stats.events_delivered, 6);
    assert_eq!(stats.events_dropped, 0);
    let delivered: usize = listener
        .statuses()
        .iter()
        .map(|s| match s {
            DeliveryStatus::Delivered { events } => *events,
            _ => 0,
        })
        .sum();
    assert_eq!(delivered, 6);
}

#[test]
fn shutdown_drains_when_idle() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[]);
    let config = DispatchConfig {
        flush_interval_ms: 60_000,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);

    append_events(&engine, 2);
    let stats = dispatcher.shutdown();

    assert_eq!(stats.events_delivered, 2);
    assert_eq!(engine.pending_count().unwrap(), 0);
}

// ---- failure handling ----

#[test]
fn transient_failures_back_off_then_recover() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[503, 503]);
    let config = DispatchConfig {
        flush_interval_ms: 60_000,
        backoff_base_ms: 100,
        backoff_cap_ms: 10_000,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);
    let listener = Arc::new(CollectingListener::default());
    dispatcher.on_delivery_status(listener.clone());

    append_events(&engine, 1);
    dispatcher.flush();

    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0
    }));
    let stats = dispatcher.shutdown();

    let statuses = listener.statuses();
    assert_eq!(statuses.len(), 3, "{statuses:?}");
    match &statuses[0] {
        DeliveryStatus::Deferred { attempt, retry_in } => {
            assert_eq!(*attempt, 1);
            assert!(*retry_in >= Duration::from_millis(50), "{retry_in:?}");
            assert!(*retry_in <= Duration::from_millis(150), "{retry_in:?}");
        }
        other => panic!("expected first deferral, got {other:?}"),
    }
    match &statuses[1] {
        DeliveryStatus::Deferred { attempt, retry_in } => {
            assert_eq!(*attempt, 2);
            assert!(*retry_in >= Duration::from_millis(100), "{retry_in:?}");
            assert!(*retry_in <= Duration::from_millis(300), "{retry_in:?}");
        }
        other => panic!("expected second deferral, got {other:?}"),
    }
    assert_eq!(statuses[2], DeliveryStatus::Delivered { events: 1 });

    assert_eq!(stats.transient_failures, 2);
    assert_eq!(stats.events_delivered, 1);
}

#[test]
fn permanent_rejection_drops_the_batch() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[400]);
    let config = DispatchConfig {
        flush_interval_ms: 60_000,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);
    let listener = Arc::new(CollectingListener::default());
    dispatcher.on_delivery_status(listener.clone());

    append_events(&engine, 3);
    dispatcher.flush();

    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0
    }));
    let stats = dispatcher.shutdown();

    assert_eq!(transport.request_count(), 1);
    assert_eq!(stats.events_dropped, 3);
    assert_eq!(stats.events_delivered, 0);
    assert!(listener
        .statuses()
        .contains(&DeliveryStatus::Dropped { events: 3 }));
}

#[test]
fn shutdown_in_backoff_keeps_events_pending() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[503]);
    let config = DispatchConfig {
        flush_interval_ms: 60_000,
        backoff_base_ms: 60_000,
        backoff_cap_ms: 120_000,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);

    append_events(&engine, 2);
    dispatcher.flush();
    assert!(wait_until(Duration::from_secs(5), || {
        transport.request_count() == 1
    }));

    let stats = dispatcher.shutdown();
    assert_eq!(stats.events_delivered, 0);
    assert_eq!(stats.transient_failures, 1);
    assert_eq!(engine.pending_count().unwrap(), 2, "released, not lost");
}

// ---- sending toggle ----

#[test]
fn disabled_sending_holds_events_until_reenabled() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[]);
    let config = DispatchConfig {
        flush_interval_ms: 25,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);
    dispatcher.set_enabled(false);

    append_events(&engine, 3);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(engine.pending_count().unwrap(), 3);

    dispatcher.set_enabled(true);
    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0
    }));
    let stats = dispatcher.shutdown();
    assert_eq!(stats.events_delivered, 3);
}

// ---- backoff override ----

#[test]
fn flush_overrides_backoff_once_per_window() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let transport = ScriptedTransport::new(&[503, 503]);
    let config = DispatchConfig {
        flush_interval_ms: 60_000,
        backoff_base_ms: 60_000,
        backoff_cap_ms: 120_000,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::start(engine.clone(), reporter_for(transport.clone()), &config);

    append_events(&engine, 1);
    dispatcher.flush();
    assert!(wait_until(Duration::from_secs(5), || {
        transport.request_count() == 1
    }));

    // First override gets through the backoff window.
    dispatcher.flush();
    assert!(wait_until(Duration::from_secs(5), || {
        transport.request_count() == 2
    }));

    // The override was spent; further flushes are ignored.
    for _ in 0..3 {
        dispatcher.flush();
    }
    thread::sleep(Duration::from_millis(200));
    assert_eq!(transport.request_count(), 2);

    let stats = dispatcher.shutdown();
    assert_eq!(stats.transient_failures, 2);
    assert_eq!(engine.pending_count().unwrap(), 1);
}
