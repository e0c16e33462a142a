//! # beacon-dispatch
//!
//! The delivery worker. A single background thread claims batches from
//! the store, hands them to the reporter and applies the outcome:
//! acknowledge on success, release and back off on transient failure,
//! drop on permanent rejection. The host talks to it through a bounded
//! command channel.

pub mod backoff;
pub mod listeners;
pub mod worker;

pub use backoff::BackoffPolicy;
pub use listeners::ListenerRegistry;
pub use worker::{Dispatcher, WorkerCommand, WorkerStats};
