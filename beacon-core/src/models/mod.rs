//! Shared model types used across subsystem crates.

pub mod app_info;
pub mod attribute;
pub mod crash;
pub mod delivery;
pub mod session;
pub mod store_health;

pub use app_info::AppInfo;
pub use attribute::AttributeValue;
pub use crash::CrashReport;
pub use delivery::{DeliveryOutcome, DeliveryStatus};
pub use session::SessionRecord;
pub use store_health::StoreHealth;
