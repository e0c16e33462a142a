use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Time source seam. Session arithmetic and event stamping go through
/// this so tests can drive the clock by hand.
pub trait IClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: IClock + ?Sized> IClock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
