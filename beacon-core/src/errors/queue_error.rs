/// Event queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("a batch of {in_flight} events is already in flight")]
    BatchAlreadyInFlight { in_flight: usize },
}
