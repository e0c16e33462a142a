//! Session boundary detection.

use std::sync::{Arc, Mutex};

use beacon_core::config::SessionConfig;
use beacon_core::errors::{BeaconResult, StorageError};
use beacon_core::models::{AppInfo, SessionRecord};
use beacon_core::traits::ISessionStorage;
use uuid::Uuid;

/// What [`SessionTracker::session_for`] decided about an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDecision {
    /// Session the event belongs to.
    pub session_id: String,
    /// True when this event opened a new session (and closed the
    /// previous one, if any). The caller emits a session-start event
    /// in that case.
    pub started_new: bool,
}

struct CurrentSession {
    id: String,
    last_event_at_ms: i64,
}

/// Assigns events to sessions by timestamp.
///
/// An event within the inactivity gap of the previous one extends the
/// current session; an event beyond it closes the current session at
/// its last event time and opens a new one. Wall clocks never enter
/// the decision, so replayed or delayed events behave deterministically.
pub struct SessionTracker {
    storage: Arc<dyn ISessionStorage>,
    gap_ms: i64,
    app: AppInfo,
    current: Mutex<Option<CurrentSession>>,
}

impl SessionTracker {
    /// Create a tracker, resuming the stored session if one is still
    /// open. A session left open by a previous process keeps accepting
    /// events while the gap allows, so short relaunches do not split
    /// sessions.
    pub fn new(
        storage: Arc<dyn ISessionStorage>,
        config: &SessionConfig,
        app: AppInfo,
    ) -> BeaconResult<Self> {
        let current = match storage.latest_session()? {
            Some(session) if session.is_open() => Some(CurrentSession {
                id: session.id,
                last_event_at_ms: session.last_event_at_ms,
            }),
            _ => None,
        };
        Ok(Self {
            storage,
            gap_ms: config.inactivity_gap_ms,
            app,
            current: Mutex::new(current),
        })
    }

    /// Decide which session an event at `timestamp_ms` belongs to,
    /// updating storage as a side effect.
    pub fn session_for(&self, timestamp_ms: i64) -> BeaconResult<SessionDecision> {
        let mut current = self.lock_current()?;

        if let Some(session) = current.as_mut() {
            if timestamp_ms - session.last_event_at_ms <= self.gap_ms {
                // Out-of-order events may carry older timestamps; the
                // session clock only moves forward.
                let last = session.last_event_at_ms.max(timestamp_ms);
                self.storage.touch_session(&session.id, last)?;
                session.last_event_at_ms = last;
                return Ok(SessionDecision {
                    session_id: session.id.clone(),
                    started_new: false,
                });
            }

            // Gap exceeded: the session ended when its last event arrived.
            self.storage
                .close_session(&session.id, session.last_event_at_ms)?;
            tracing::debug!(session_id = %session.id, "session: closed by inactivity gap");
        }

        let id = self.open_session(timestamp_ms)?;
        *current = Some(CurrentSession {
            id: id.clone(),
            last_event_at_ms: timestamp_ms,
        });
        Ok(SessionDecision {
            session_id: id,
            started_new: true,
        })
    }

    /// Close the current session on the explicit app-background signal.
    /// Returns the closed session id, if any.
    pub fn close_current(&self, timestamp_ms: i64) -> BeaconResult<Option<String>> {
        let mut current = self.lock_current()?;
        match current.take() {
            None => Ok(None),
            Some(session) => {
                let ended_at = session.last_event_at_ms.max(timestamp_ms);
                self.storage.close_session(&session.id, ended_at)?;
                tracing::debug!(session_id = %session.id, "session: closed by host signal");
                Ok(Some(session.id))
            }
        }
    }

    /// Id of the session currently accepting events, if any.
    pub fn current_session_id(&self) -> BeaconResult<Option<String>> {
        let current = self.lock_current()?;
        Ok(current.as_ref().map(|s| s.id.clone()))
    }

    fn open_session(&self, timestamp_ms: i64) -> BeaconResult<String> {
        let id = Uuid::new_v4().to_string();
        self.storage.open_session(&SessionRecord {
            id: id.clone(),
            started_at_ms: timestamp_ms,
            last_event_at_ms: timestamp_ms,
            ended_at_ms: None,
            app: self.app.clone(),
        })?;
        tracing::debug!(session_id = %id, "session: opened");
        Ok(id)
    }

    fn lock_current(
        &self,
    ) -> BeaconResult<std::sync::MutexGuard<'_, Option<CurrentSession>>> {
        self.current.lock().map_err(|_| {
            StorageError::SqliteError {
                message: "session state lock poisoned".to_string(),
            }
            .into()
        })
    }
}
