use serde::{Deserialize, Serialize};

/// A crash captured by the host before the current process started.
/// Crash sources hand these over once; the client converts each into
/// a crash event and flushes immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
    /// Wall-clock time of the crash in milliseconds since the epoch.
    pub occurred_at_ms: i64,
    /// Opaque serialized crash payload (stack traces, thread state).
    pub payload: Vec<u8>,
}
