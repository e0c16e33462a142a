//! # beacon-core
//!
//! Foundation crate for the Beacon telemetry SDK.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::BeaconConfig;
pub use errors::{BeaconError, BeaconResult};
pub use events::{Batch, EventKind, EventRecord, NewEvent};
pub use models::{AppInfo, AttributeValue, DeliveryOutcome, DeliveryStatus, StoreHealth};
