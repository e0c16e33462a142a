use std::sync::Arc;

use crate::errors::BeaconResult;
use crate::events::{Batch, NewEvent};
use crate::models::{AttributeValue, SessionRecord};

/// Durable event queue.
///
/// One batch may be in flight at a time. `claim_batch` marks the claimed
/// rows so a crash between claim and acknowledge leaves them recoverable,
/// and refuses to claim again until the outstanding batch is acknowledged
/// or released.
pub trait IEventStorage: Send + Sync {
    /// Persist one event and return its queue id. Trims oldest pending
    /// events in the same transaction when the total cap is exceeded.
    fn append(&self, event: NewEvent) -> BeaconResult<i64>;

    /// Claim the oldest pending events up to the given limits and mark
    /// them in flight. An empty store yields an empty batch.
    fn claim_batch(&self, max_events: usize, max_bytes: u64) -> BeaconResult<Batch>;

    /// Delete delivered events. Returns how many rows were removed.
    fn acknowledge(&self, ids: &[i64]) -> BeaconResult<usize>;

    /// Return claimed events to pending and bump their attempt count.
    fn release(&self, ids: &[i64]) -> BeaconResult<usize>;

    /// Drop oldest pending events until the retained payload bytes fit
    /// the configured cap. Returns how many rows were dropped.
    fn trim_to_cap(&self) -> BeaconResult<usize>;

    fn pending_count(&self) -> BeaconResult<usize>;

    /// Sum of payload sizes across all retained events.
    fn total_payload_bytes(&self) -> BeaconResult<u64>;
}

/// Typed key-value store backing profile attributes and SDK metadata.
pub trait IKeyValueStorage: Send + Sync {
    /// Insert or overwrite a value. Overwriting may change the kind.
    fn put(&self, key: &str, value: &AttributeValue) -> BeaconResult<()>;

    fn get(&self, key: &str) -> BeaconResult<Option<AttributeValue>>;

    /// Remove a key. Returns whether it existed.
    fn delete(&self, key: &str) -> BeaconResult<bool>;

    /// Add `delta` to a counter, creating it at `delta` when absent.
    /// Fails with a kind mismatch when the key holds a non-counter.
    fn increment(&self, key: &str, delta: i64) -> BeaconResult<i64>;

    /// Union `values` into a string set, creating it when absent.
    /// Fails with a kind mismatch when the key holds a non-set.
    /// Returns the resulting set size.
    fn merge_set(&self, key: &str, values: &[String]) -> BeaconResult<usize>;
}

/// Session bookkeeping rows.
pub trait ISessionStorage: Send + Sync {
    fn open_session(&self, session: &SessionRecord) -> BeaconResult<()>;

    /// Advance the last-event timestamp of an open session.
    fn touch_session(&self, id: &str, last_event_at_ms: i64) -> BeaconResult<()>;

    fn close_session(&self, id: &str, ended_at_ms: i64) -> BeaconResult<()>;

    /// Most recently started session, open or closed.
    fn latest_session(&self) -> BeaconResult<Option<SessionRecord>>;
}

impl<T: IEventStorage + ?Sized> IEventStorage for Arc<T> {
    fn append(&self, event: NewEvent) -> BeaconResult<i64> {
        (**self).append(event)
    }

    fn claim_batch(&self, max_events: usize, max_bytes: u64) -> BeaconResult<Batch> {
        (**self).claim_batch(max_events, max_bytes)
    }

    fn acknowledge(&self, ids: &[i64]) -> BeaconResult<usize> {
        (**self).acknowledge(ids)
    }

    fn release(&self, ids: &[i64]) -> BeaconResult<usize> {
        (**self).release(ids)
    }

    fn trim_to_cap(&self) -> BeaconResult<usize> {
        (**self).trim_to_cap()
    }

    fn pending_count(&self) -> BeaconResult<usize> {
        (**self).pending_count()
    }

    fn total_payload_bytes(&self) -> BeaconResult<u64> {
        (**self).total_payload_bytes()
    }
}

impl<T: IKeyValueStorage + ?Sized> IKeyValueStorage for Arc<T> {
    fn put(&self, key: &str, value: &AttributeValue) -> BeaconResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> BeaconResult<Option<AttributeValue>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> BeaconResult<bool> {
        (**self).delete(key)
    }

    fn increment(&self, key: &str, delta: i64) -> BeaconResult<i64> {
        (**self).increment(key, delta)
    }

    fn merge_set(&self, key: &str, values: &[String]) -> BeaconResult<usize> {
        (**self).merge_set(key, values)
    }
}

impl<T: ISessionStorage + ?Sized> ISessionStorage for Arc<T> {
    fn open_session(&self, session: &SessionRecord) -> BeaconResult<()> {
        (**self).open_session(session)
    }

    fn touch_session(&self, id: &str, last_event_at_ms: i64) -> BeaconResult<()> {
        (**self).touch_session(id, last_event_at_ms)
    }

    fn close_session(&self, id: &str, ended_at_ms: i64) -> BeaconResult<()> {
        (**self).close_session(id, ended_at_ms)
    }

    fn latest_session(&self) -> BeaconResult<Option<SessionRecord>> {
        (**self).latest_session()
    }
}
