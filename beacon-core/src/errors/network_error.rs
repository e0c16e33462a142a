/// Transport-layer errors. The reporter classifies these into delivery
/// outcomes; they never propagate to the host.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("malformed frame: {details}")]
    MalformedFrame { details: String },
}
