use serde::{Deserialize, Serialize};

/// Kind of a telemetry event. Stored as text, sent on the wire as a
/// numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// First event after SDK activation on a fresh install.
    Init,
    /// Opens a new session.
    SessionStart,
    /// Host-reported application event.
    Client,
    /// Crash report captured by an attached crash source.
    Crash,
    /// Revenue / purchase event.
    Revenue,
    /// Profile attribute update.
    Profile,
}

impl EventKind {
    /// Every kind, in wire-code order.
    pub const ALL: [EventKind; 6] = [
        EventKind::Init,
        EventKind::SessionStart,
        EventKind::Crash,
        EventKind::Client,
        EventKind::Revenue,
        EventKind::Profile,
    ];

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::SessionStart => "session_start",
            EventKind::Client => "client",
            EventKind::Crash => "crash",
            EventKind::Revenue => "revenue",
            EventKind::Profile => "profile",
        }
    }

    /// Parse the storage representation. Unknown strings are treated as
    /// malformed rows by the integrity scan.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "init" => Some(EventKind::Init),
            "session_start" => Some(EventKind::SessionStart),
            "client" => Some(EventKind::Client),
            "crash" => Some(EventKind::Crash),
            "revenue" => Some(EventKind::Revenue),
            "profile" => Some(EventKind::Profile),
            _ => None,
        }
    }

    /// Numeric code used in the wire format.
    pub fn code(&self) -> u64 {
        match self {
            EventKind::Init => 1,
            EventKind::SessionStart => 2,
            EventKind::Client => 4,
            EventKind::Crash => 3,
            EventKind::Revenue => 5,
            EventKind::Profile => 6,
        }
    }

    /// Inverse of [`EventKind::code`].
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(EventKind::Init),
            2 => Some(EventKind::SessionStart),
            4 => Some(EventKind::Client),
            3 => Some(EventKind::Crash),
            5 => Some(EventKind::Revenue),
            6 => Some(EventKind::Profile),
            _ => None,
        }
    }

    /// Crash events skip the pending-count threshold and trigger an
    /// immediate flush.
    pub fn is_urgent(&self) -> bool {
        matches!(self, EventKind::Crash)
    }
}
