use serde::{Deserialize, Serialize};

use super::kind::EventKind;

/// Queue state of a persisted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Waiting to be claimed by a dispatch cycle.
    Pending,
    /// Claimed by the current dispatch cycle.
    InFlight,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Pending => "pending",
            EventState::InFlight => "in_flight",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EventState::Pending),
            "in_flight" => Some(EventState::InFlight),
            _ => None,
        }
    }
}

/// An event as reported by the host, before it has an id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    pub session_id: String,
    /// Already-serialized event body, opaque to the queue.
    pub payload: Vec<u8>,
}

/// An event as persisted in the queue. Immutable once written except
/// `attempt_count` and `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Monotonic local sequence, assigned by the store.
    pub id: i64,
    pub kind: EventKind,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    pub session_id: String,
    pub payload: Vec<u8>,
    /// Payload byte length, denormalized for trim accounting.
    pub size: u64,
    /// Number of completed delivery attempts that failed.
    pub attempt_count: u32,
    pub state: EventState,
}
