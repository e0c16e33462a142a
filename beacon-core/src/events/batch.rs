use super::record::EventRecord;

/// A claimed set of events headed for the collector. At most one batch
/// is in flight per store at any time.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// Events in ascending id order. Never reordered.
    pub events: Vec<EventRecord>,
}

impl Batch {
    pub fn new(events: Vec<EventRecord>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Ids of the claimed events, for acknowledge/release.
    pub fn ids(&self) -> Vec<i64> {
        self.events.iter().map(|e| e.id).collect()
    }

    /// Total payload bytes in the batch.
    pub fn total_bytes(&self) -> u64 {
        self.events.iter().map(|e| e.size).sum()
    }
}
