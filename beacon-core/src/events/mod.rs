//! Event domain types: kinds, persisted records, claimed batches.

pub mod batch;
pub mod kind;
pub mod record;

pub use batch::Batch;
pub use kind::EventKind;
pub use record::{EventRecord, EventState, NewEvent};
