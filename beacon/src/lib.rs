//! # beacon
//!
//! Host-facing crate of the Beacon telemetry SDK. [`BeaconClient`] owns
//! the whole pipeline: the durable SQLite event queue, session
//! tracking, profile attributes and the background delivery worker.
//!
//! ```no_run
//! use beacon::{AppInfo, BeaconClient, BeaconConfig, EventKind};
//!
//! let config = BeaconConfig::new(
//!     "api-key",
//!     "https://collector.example/report",
//!     AppInfo::default(),
//! );
//! let client = BeaconClient::start(config)?;
//! client.report_event(EventKind::Client, br#"{"screen":"home"}"#.to_vec());
//! client.shutdown();
//! # Ok::<(), beacon::BeaconError>(())
//! ```

pub mod client;

pub use client::BeaconClient;

pub use beacon_core::config::{
    BeaconConfig, DispatchConfig, NetworkConfig, SessionConfig, StorageConfig,
};
pub use beacon_core::errors::{BeaconError, BeaconResult, ConfigError};
pub use beacon_core::events::EventKind;
pub use beacon_core::models::{
    AppInfo, AttributeValue, CrashReport, DeliveryStatus, StoreHealth,
};
pub use beacon_core::traits::{ICrashSource, IDeliveryListener, ITransport};
pub use beacon_dispatch::WorkerStats;
