use crate::models::CrashReport;

/// Provider of crash reports captured before the current launch.
/// `drain` hands each report over exactly once; the implementation
/// removes them from its own storage.
pub trait ICrashSource: Send + Sync {
    fn drain(&self) -> Vec<CrashReport>;
}
