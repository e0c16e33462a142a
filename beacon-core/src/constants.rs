/// Beacon SDK version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire protocol version sent in every batch envelope.
pub const PROTOCOL_VERSION: u64 = 1;

/// Key-value key holding the installation identifier (first-run UUID).
pub const KV_INSTALL_ID: &str = "install_id";

/// Key-value key holding the data-sending toggle.
pub const KV_DATA_SENDING_ENABLED: &str = "data_sending_enabled";

/// Namespace prefix for profile attributes in the key-value store.
pub const PROFILE_KEY_PREFIX: &str = "profile.";

/// Maximum number of events a single claim may return, regardless of config.
pub const MAX_BATCH_EVENTS: usize = 1000;
