use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::models::AppInfo;

use super::dispatch_config::DispatchConfig;
use super::network_config::NetworkConfig;
use super::session_config::SessionConfig;
use super::storage_config::StorageConfig;

/// Top-level configuration handed to the client at startup.
///
/// Everything except `api_key` and `endpoint_url` has a working default,
/// so the minimal host setup is the two identifiers plus `AppInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Application identifier issued by the ingest backend.
    pub api_key: String,
    /// Base URL reports are posted to.
    pub endpoint_url: String,
    /// Metadata describing the host application, embedded in every report.
    pub app: AppInfo,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
    pub network: NetworkConfig,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint_url: String::new(),
            app: AppInfo::default(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig::default(),
            session: SessionConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl BeaconConfig {
    /// Convenience constructor for the common host setup.
    pub fn new(api_key: impl Into<String>, endpoint_url: impl Into<String>, app: AppInfo) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint_url: endpoint_url.into(),
            app,
            ..Self::default()
        }
    }

    /// Check the parts with no usable default. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !self.endpoint_url.starts_with("http://") && !self.endpoint_url.starts_with("https://") {
            return Err(ConfigError::InvalidEndpoint {
                url: self.endpoint_url.clone(),
            });
        }
        Ok(())
    }
}
