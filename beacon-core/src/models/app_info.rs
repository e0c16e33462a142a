use serde::{Deserialize, Serialize};

/// Device and application metadata supplied by the host at startup.
/// Captured into each session row at session start and attached to
/// every batch envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub app_version: String,
    pub os_name: String,
    pub os_version: String,
    pub device_model: String,
    pub locale: String,
}
