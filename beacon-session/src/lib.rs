//! # beacon-session
//!
//! Session boundary tracking and profile attribute management.
//!
//! Sessions are a pure function of event timestamps and the configured
//! inactivity gap; no timers run here. Profile attributes are typed
//! key-value entries namespaced into the shared store.

pub mod profile;
pub mod tracker;

pub use profile::{AttributeUpdate, ProfileWriter};
pub use tracker::{SessionDecision, SessionTracker};
