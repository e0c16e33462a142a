use std::time::Duration;

/// How a single send attempt went, after status classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The server accepted the batch. Events may be deleted.
    Success,
    /// Retryable failure (timeout, 5xx, throttling). Events go back
    /// to pending and backoff grows.
    TransientFailure,
    /// Non-retryable rejection. Events are dropped to protect the queue.
    PermanentFailure,
}

/// Progress notification delivered to registered listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// A batch was accepted and removed from the queue.
    Delivered { events: usize },
    /// A batch failed transiently and will be retried.
    Deferred { attempt: u32, retry_in: Duration },
    /// A batch was rejected permanently and discarded.
    Dropped { events: usize },
}
