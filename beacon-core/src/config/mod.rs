//! Configuration types.
//!
//! Every struct derives `Deserialize` with `#[serde(default)]`, so hosts
//! can supply a partial JSON blob and inherit the rest from
//! [`defaults`].

pub mod beacon_config;
pub mod defaults;
pub mod dispatch_config;
pub mod network_config;
pub mod session_config;
pub mod storage_config;

pub use beacon_config::BeaconConfig;
pub use dispatch_config::DispatchConfig;
pub use network_config::NetworkConfig;
pub use session_config::SessionConfig;
pub use storage_config::StorageConfig;
