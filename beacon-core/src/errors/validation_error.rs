/// Input validation errors on the reporting path.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("invalid event timestamp: {timestamp_ms}")]
    InvalidTimestamp { timestamp_ms: i64 },
}
