use serde::{Deserialize, Serialize};

use super::app_info::AppInfo;

/// One tracked session. A session stays open while events keep arriving
/// within the inactivity gap; the first event past the gap closes it and
/// opens a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub started_at_ms: i64,
    /// Timestamp of the most recent event attributed to this session.
    pub last_event_at_ms: i64,
    /// Set when the session is closed; `None` while current.
    pub ended_at_ms: Option<i64>,
    /// Snapshot of the app metadata at session start.
    pub app: AppInfo,
}

impl SessionRecord {
    pub fn is_open(&self) -> bool {
        self.ended_at_ms.is_none()
    }
}
