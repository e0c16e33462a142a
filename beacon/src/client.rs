//! The client context object.
//!
//! `BeaconClient::start` wires storage, sessions, profile writes and
//! the dispatch worker together and is the only place process-wide
//! state is created. Reporting-path methods are best-effort: they
//! return after the event is durable locally and log instead of
//! propagating failures, so instrumentation can never take the host
//! app down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_core::config::BeaconConfig;
use beacon_core::constants::{KV_DATA_SENDING_ENABLED, KV_INSTALL_ID, VERSION};
use beacon_core::errors::BeaconResult;
use beacon_core::events::{EventKind, NewEvent};
use beacon_core::models::{AttributeValue, StoreHealth};
use beacon_core::traits::{
    IClock, ICrashSource, IDeliveryListener, IEventStorage, IKeyValueStorage, ISessionStorage,
    ITransport, SystemClock,
};
use beacon_dispatch::{Dispatcher, WorkerStats};
use beacon_net::{EnvelopeContext, HttpTransport, Reporter};
use beacon_session::{AttributeUpdate, ProfileWriter, SessionTracker};
use beacon_storage::StorageEngine;
use uuid::Uuid;

/// The SDK entry point. One instance per host application.
///
/// All methods are callable from any thread. Reporting methods block
/// only for the local SQLite write; network delivery happens on the
/// background worker.
pub struct BeaconClient {
    storage: Arc<StorageEngine>,
    session: SessionTracker,
    profile: ProfileWriter,
    dispatcher: Dispatcher,
    clock: Arc<dyn IClock>,
    data_sending_enabled: AtomicBool,
    pending_threshold: usize,
    install_id: String,
}

impl BeaconClient {
    /// Start the SDK with the production HTTP transport.
    pub fn start(config: BeaconConfig) -> BeaconResult<Self> {
        let transport = HttpTransport::new(&config.network)?;
        Self::start_with_transport(config, Arc::new(transport))
    }

    /// Start the SDK posting reports through the given transport.
    /// Hosts with their own network stack (and tests) inject it here.
    pub fn start_with_transport(
        config: BeaconConfig,
        transport: Arc<dyn ITransport>,
    ) -> BeaconResult<Self> {
        config.validate()?;
        tracing::info!(
            version = VERSION,
            db = %config.storage.db_path.display(),
            "beacon: starting"
        );

        let storage = Arc::new(StorageEngine::open(&config.storage)?);
        let health = storage.health();
        if health != StoreHealth::Healthy {
            tracing::warn!(?health, "beacon: store needed repair at startup");
        }

        // Installation identity. Its absence is what defines a fresh
        // install, so the id is read before anything else writes.
        let kv: Arc<dyn IKeyValueStorage> = storage.clone();
        let stored_id = match kv.get(KV_INSTALL_ID)? {
            Some(AttributeValue::Text(id)) if !id.is_empty() => Some(id),
            _ => None,
        };
        let (install_id, fresh_install) = match stored_id {
            Some(id) => (id, false),
            None => {
                let id = Uuid::new_v4().to_string();
                kv.put(KV_INSTALL_ID, &AttributeValue::Text(id.clone()))?;
                tracing::info!(install_id = %id, "beacon: fresh install");
                (id, true)
            }
        };

        let data_sending = match kv.get(KV_DATA_SENDING_ENABLED)? {
            Some(AttributeValue::Bool(enabled)) => enabled,
            _ => true,
        };

        // Sessions and profile share the storage handle.
        let session_storage: Arc<dyn ISessionStorage> = storage.clone();
        let session = SessionTracker::new(session_storage, &config.session, config.app.clone())?;
        let profile = ProfileWriter::new(kv);

        let clock: Arc<dyn IClock> = Arc::new(SystemClock);
        let reporter = Reporter::new(
            transport,
            config.endpoint_url.clone(),
            EnvelopeContext {
                api_key: config.api_key.clone(),
                install_id: install_id.clone(),
                app: config.app.clone(),
            },
            clock.clone(),
        );

        let event_storage: Arc<dyn IEventStorage> = storage.clone();
        let dispatcher = Dispatcher::start(event_storage, reporter, &config.dispatch);
        if !data_sending {
            dispatcher.set_enabled(false);
        }

        let client = Self {
            storage,
            session,
            profile,
            dispatcher,
            clock,
            data_sending_enabled: AtomicBool::new(data_sending),
            pending_threshold: config.dispatch.pending_threshold,
            install_id,
        };

        if fresh_install && data_sending {
            let payload = serde_json::json!({ "sdk_version": VERSION })
                .to_string()
                .into_bytes();
            if let Err(e) = client.enqueue(EventKind::Init, payload, client.clock.now_ms()) {
                tracing::warn!(error = %e, "beacon: init event not recorded");
            }
        }

        Ok(client)
    }

    /// Identifier assigned on first run, stable for the install's
    /// lifetime. Attached to every report envelope.
    pub fn install_id(&self) -> &str {
        &self.install_id
    }

    /// How the store came up at startup.
    pub fn store_health(&self) -> StoreHealth {
        self.storage.health()
    }

    /// Record an event stamped with the current wall clock.
    pub fn report_event(&self, kind: EventKind, payload: Vec<u8>) {
        self.report_event_at(kind, payload, self.clock.now_ms());
    }

    /// Record an event with an explicit timestamp (epoch milliseconds).
    /// Returns once the event is durable locally; delivery is
    /// asynchronous.
    pub fn report_event_at(&self, kind: EventKind, payload: Vec<u8>, timestamp_ms: i64) {
        if !self.data_sending_enabled.load(Ordering::Relaxed) {
            tracing::debug!(kind = kind.as_str(), "beacon: data sending disabled, event discarded");
            return;
        }
        match self.enqueue(kind, payload, timestamp_ms) {
            Ok(_) => self.nudge(kind),
            Err(e) => {
                tracing::warn!(error = %e, kind = kind.as_str(), "beacon: event not recorded");
            }
        }
    }

    /// Apply a profile attribute mutation and record a profile event
    /// for it. Counters accumulate, string sets union, text and bool
    /// overwrite; a mutation with a different kind than the stored one
    /// keeps the previous value and records nothing.
    pub fn set_profile_attribute(&self, key: &str, value: AttributeValue) {
        if !self.data_sending_enabled.load(Ordering::Relaxed) {
            tracing::debug!(key, "beacon: data sending disabled, attribute discarded");
            return;
        }
        match self.profile.set(key, &value) {
            Ok(AttributeUpdate::Applied { current }) => {
                let payload = serde_json::json!({ "key": key, "value": current })
                    .to_string()
                    .into_bytes();
                match self.enqueue(EventKind::Profile, payload, self.clock.now_ms()) {
                    Ok(_) => self.nudge(EventKind::Profile),
                    Err(e) => {
                        tracing::warn!(error = %e, key, "beacon: profile event not recorded");
                    }
                }
            }
            Ok(AttributeUpdate::TypeMismatch { previous }) => {
                tracing::debug!(
                    key,
                    stored = previous.kind(),
                    requested = value.kind(),
                    "beacon: profile attribute kept its previous kind"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, key, "beacon: profile attribute not stored");
            }
        }
    }

    /// Pull crash reports captured before this launch and queue them as
    /// crash events. Crashes skip the batching thresholds and flush
    /// immediately.
    pub fn attach_crash_source(&self, source: Arc<dyn ICrashSource>) {
        if !self.data_sending_enabled.load(Ordering::Relaxed) {
            tracing::debug!("beacon: data sending disabled, crash source ignored");
            return;
        }
        let reports = source.drain();
        if reports.is_empty() {
            return;
        }
        tracing::info!(count = reports.len(), "beacon: crash reports recovered");
        for report in reports {
            if let Err(e) = self.enqueue(EventKind::Crash, report.payload, report.occurred_at_ms) {
                tracing::warn!(error = %e, "beacon: crash report not recorded");
            }
        }
        self.dispatcher.flush();
    }

    /// Register a delivery progress callback.
    pub fn on_delivery_status(&self, listener: Arc<dyn IDeliveryListener>) {
        self.dispatcher.on_delivery_status(listener);
    }

    /// Ask the worker to send what is queued, ahead of the timer.
    pub fn flush(&self) {
        self.dispatcher.flush();
    }

    /// Close the running session, typically on the host's background
    /// signal. The next reported event opens a fresh session.
    pub fn close_session(&self) {
        if let Err(e) = self.session.close_current(self.clock.now_ms()) {
            tracing::warn!(error = %e, "beacon: session close failed");
        }
    }

    /// Turn data collection and upload on or off. The preference is
    /// persisted and survives restarts. While off, reported events are
    /// discarded and the worker sends nothing.
    pub fn set_data_sending_enabled(&self, enabled: bool) {
        self.data_sending_enabled.store(enabled, Ordering::Relaxed);
        self.dispatcher.set_enabled(enabled);
        let toggle = AttributeValue::Bool(enabled);
        if let Err(e) = self.storage.put(KV_DATA_SENDING_ENABLED, &toggle) {
            tracing::warn!(error = %e, "beacon: data sending preference not persisted");
        }
        tracing::info!(enabled, "beacon: data sending toggled");
    }

    /// Stop the worker, then close storage. Undelivered events stay on
    /// disk for the next run; the open session also survives, so a
    /// quick relaunch continues it.
    pub fn shutdown(self) -> WorkerStats {
        tracing::info!("beacon: shutting down");
        let BeaconClient {
            storage,
            session,
            profile,
            dispatcher,
            ..
        } = self;

        let stats = dispatcher.shutdown();
        drop(session);
        drop(profile);

        match Arc::try_unwrap(storage) {
            Ok(engine) => {
                if let Err(e) = engine.close() {
                    tracing::warn!(error = %e, "beacon: storage close failed");
                }
            }
            Err(_still_shared) => {
                tracing::warn!("beacon: storage handle still shared, skipping close");
            }
        }
        stats
    }

    /// Append through the session tracker. A new session gets its
    /// session-start marker queued before the event that opened it.
    fn enqueue(&self, kind: EventKind, payload: Vec<u8>, timestamp_ms: i64) -> BeaconResult<i64> {
        let decision = self.session.session_for(timestamp_ms)?;
        if decision.started_new {
            self.storage.append(NewEvent {
                kind: EventKind::SessionStart,
                timestamp_ms,
                session_id: decision.session_id.clone(),
                payload: Vec::new(),
            })?;
        }
        self.storage.append(NewEvent {
            kind,
            timestamp_ms,
            session_id: decision.session_id,
            payload,
        })
    }

    /// Flush early when a crash arrives or the queue crosses the
    /// pending threshold.
    fn nudge(&self, kind: EventKind) {
        if kind.is_urgent() {
            self.dispatcher.flush();
            return;
        }
        match self.storage.pending_count() {
            Ok(pending) if pending >= self.pending_threshold => self.dispatcher.flush(),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "beacon: pending count unavailable"),
        }
    }
}
