//! Error handling for Beacon.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod network_error;
pub mod queue_error;
pub mod storage_error;
pub mod validation_error;

pub use config_error::ConfigError;
pub use network_error::NetworkError;
pub use queue_error::QueueError;
pub use storage_error::StorageError;
pub use validation_error::ValidationError;

/// Umbrella error wrapping every subsystem error.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("queue error: {0}")]
    QueueError(#[from] QueueError),

    #[error("validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("network error: {0}")]
    NetworkError(#[from] NetworkError),

    #[error("config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Workspace-wide result alias.
pub type BeaconResult<T> = Result<T, BeaconError>;
