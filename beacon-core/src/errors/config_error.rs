/// Configuration errors. The only error class surfaced to the host at
/// initialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key is missing or empty")]
    MissingApiKey,

    #[error("invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}
