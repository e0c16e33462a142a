//! The dispatch worker thread.
//!
//! Between channel receives the machine sits in `Idle` or `Backoff`;
//! a trigger (interval tick, flush request, backoff deadline) runs one
//! flush cycle which resolves back into one of the two. The cycle
//! drains the queue batch by batch until it is empty or a failure
//! stops it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use beacon_core::config::DispatchConfig;
use beacon_core::errors::{BeaconError, QueueError};
use beacon_core::models::{DeliveryOutcome, DeliveryStatus};
use beacon_core::traits::{IDeliveryListener, IEventStorage};
use beacon_net::Reporter;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::backoff::BackoffPolicy;
use crate::listeners::ListenerRegistry;

const COMMAND_QUEUE_DEPTH: usize = 32;

/// Control messages accepted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Run a flush cycle now. During a backoff window only the first
    /// request gets through; the rest are ignored until the window
    /// ends.
    Flush,
    /// Drain if idle, then stop.
    Shutdown,
}

/// Lifetime counters, returned by [`Dispatcher::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub flush_cycles: usize,
    pub batches_delivered: usize,
    pub events_delivered: usize,
    pub events_dropped: usize,
    pub transient_failures: usize,
}

#[derive(Debug, Clone, Copy)]
enum DispatchState {
    /// Waiting for the periodic interval or a flush request.
    Idle,
    /// The last attempt failed transiently; retry at `until`.
    Backoff {
        attempt: u32,
        until: Instant,
        override_used: bool,
    },
}

/// Owns the worker thread and the command channel.
pub struct Dispatcher {
    tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<WorkerStats>>,
    listeners: Arc<ListenerRegistry>,
    enabled: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Spawn the worker. It flushes every `flush_interval_ms` on its
    /// own; [`Dispatcher::flush`] only moves the next cycle forward.
    pub fn start(
        storage: Arc<dyn IEventStorage>,
        reporter: Reporter,
        config: &DispatchConfig,
    ) -> Self {
        let (tx, rx) = bounded(COMMAND_QUEUE_DEPTH);
        let listeners = Arc::new(ListenerRegistry::new());
        let enabled = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            storage,
            reporter,
            listeners: Arc::clone(&listeners),
            enabled: Arc::clone(&enabled),
            backoff: BackoffPolicy::from_millis(config.backoff_base_ms, config.backoff_cap_ms),
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            batch_max_events: config.batch_max_events,
            batch_max_bytes: config.batch_max_bytes,
            stats: WorkerStats::default(),
        };
        let handle = thread::spawn(move || worker.run(rx));
        Self {
            tx,
            handle: Some(handle),
            listeners,
            enabled,
        }
    }

    /// Request a flush. Cheap to call; requests coalesce when the
    /// worker is behind.
    pub fn flush(&self) {
        let _ = self.tx.try_send(WorkerCommand::Flush);
    }

    pub fn on_delivery_status(&self, listener: Arc<dyn IDeliveryListener>) {
        self.listeners.register(listener);
    }

    /// Turn sending on or off. While off, flush cycles are skipped and
    /// events accumulate in the store (subject to its byte cap).
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if enabled {
            self.flush();
        }
    }

    /// Stop the worker and collect its counters. Anything not yet
    /// delivered stays pending in the store for the next run.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop()
    }

    fn stop(&mut self) -> WorkerStats {
        let Some(handle) = self.handle.take() else {
            return WorkerStats::default();
        };
        let _ = self.tx.send(WorkerCommand::Shutdown);
        handle.join().unwrap_or_else(|_| {
            tracing::error!("dispatch: worker thread panicked");
            WorkerStats::default()
        })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

struct Worker {
    storage: Arc<dyn IEventStorage>,
    reporter: Reporter,
    listeners: Arc<ListenerRegistry>,
    enabled: Arc<AtomicBool>,
    backoff: BackoffPolicy,
    flush_interval: Duration,
    batch_max_events: usize,
    batch_max_bytes: u64,
    stats: WorkerStats,
}

impl Worker {
    fn run(mut self, rx: Receiver<WorkerCommand>) -> WorkerStats {
        tracing::debug!("dispatch: worker started");
        let mut state = DispatchState::Idle;

        loop {
            let wait = match state {
                DispatchState::Idle => self.flush_interval,
                DispatchState::Backoff { until, .. } => {
                    until.saturating_duration_since(Instant::now())
                }
            };

            match rx.recv_timeout(wait) {
                Ok(WorkerCommand::Flush) => {
                    state = match state {
                        DispatchState::Idle => self.flush_cycle(0, false),
                        DispatchState::Backoff {
                            attempt,
                            until,
                            override_used,
                        } => {
                            if Instant::now() >= until {
                                self.flush_cycle(attempt, false)
                            } else if override_used {
                                tracing::debug!(
                                    attempt,
                                    "dispatch: flush ignored, override already used in this \
                                     backoff window"
                                );
                                state
                            } else {
                                tracing::debug!(attempt, "dispatch: flush overrides backoff");
                                self.flush_cycle(attempt, true)
                            }
                        }
                    };
                }
                Ok(WorkerCommand::Shutdown) => {
                    tracing::debug!("dispatch: shutdown requested");
                    if matches!(state, DispatchState::Idle) {
                        self.flush_cycle(0, false);
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    state = match state {
                        DispatchState::Idle => self.flush_cycle(0, false),
                        DispatchState::Backoff { attempt, until, .. } => {
                            if Instant::now() >= until {
                                self.flush_cycle(attempt, false)
                            } else {
                                state
                            }
                        }
                    };
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!(stats = ?self.stats, "dispatch: worker stopped");
        self.stats
    }

    /// One flush cycle: claim, send, apply the outcome, repeat until
    /// the queue is empty or a failure stops the cycle.
    ///
    /// `prior_attempt` carries the failure streak into the cycle; any
    /// success or permanent drop inside the cycle resets it.
    /// `override_spent` marks a cycle forced through an active backoff
    /// window: if it fails again, the new window starts with its
    /// override already consumed, so repeated host flushes cost at
    /// most one extra request per scheduled retry.
    fn flush_cycle(&mut self, prior_attempt: u32, override_spent: bool) -> DispatchState {
        if !self.enabled.load(Ordering::Relaxed) {
            tracing::debug!("dispatch: sending disabled, flush skipped");
            return DispatchState::Idle;
        }
        self.stats.flush_cycles += 1;
        let mut attempt_floor = prior_attempt;

        loop {
            let batch = match self
                .storage
                .claim_batch(self.batch_max_events, self.batch_max_bytes)
            {
                Ok(batch) => batch,
                Err(BeaconError::QueueError(QueueError::BatchAlreadyInFlight { in_flight })) => {
                    tracing::warn!(in_flight, "dispatch: claim refused, batch already in flight");
                    return DispatchState::Idle;
                }
                Err(e) => {
                    tracing::error!(error = %e, "dispatch: claim failed");
                    return DispatchState::Idle;
                }
            };
            if batch.is_empty() {
                return DispatchState::Idle;
            }

            match self.reporter.send(&batch) {
                DeliveryOutcome::Success => {
                    if let Err(e) = self.storage.acknowledge(&batch.ids()) {
                        tracing::error!(error = %e, "dispatch: acknowledge failed");
                        return DispatchState::Idle;
                    }
                    self.stats.batches_delivered += 1;
                    self.stats.events_delivered += batch.len();
                    attempt_floor = 0;
                    self.listeners.notify(&DeliveryStatus::Delivered {
                        events: batch.len(),
                    });
                }
                DeliveryOutcome::TransientFailure => {
                    if let Err(e) = self.storage.release(&batch.ids()) {
                        tracing::error!(error = %e, "dispatch: release failed");
                    }
                    let attempt = attempt_floor.saturating_add(1);
                    let delay = self.backoff.jittered_delay(attempt);
                    self.stats.transient_failures += 1;
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        events = batch.len(),
                        "dispatch: batch deferred"
                    );
                    self.listeners.notify(&DeliveryStatus::Deferred {
                        attempt,
                        retry_in: delay,
                    });
                    return DispatchState::Backoff {
                        attempt,
                        until: Instant::now() + delay,
                        override_used: override_spent,
                    };
                }
                DeliveryOutcome::PermanentFailure => {
                    tracing::warn!(
                        events = batch.len(),
                        "dispatch: batch rejected by the collector, dropping"
                    );
                    if let Err(e) = self.storage.acknowledge(&batch.ids()) {
                        tracing::error!(error = %e, "dispatch: drop failed");
                        return DispatchState::Idle;
                    }
                    self.stats.events_dropped += batch.len();
                    attempt_floor = 0;
                    self.listeners.notify(&DeliveryStatus::Dropped {
                        events: batch.len(),
                    });
                }
            }
        }
    }
}
