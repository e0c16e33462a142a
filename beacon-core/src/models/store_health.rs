/// Outcome of the startup integrity pass over the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    /// Schema and rows checked out without intervention.
    Healthy,
    /// Malformed rows were dropped; the rest of the store survived.
    Repaired { dropped_rows: usize },
    /// The file or schema was unusable and was rebuilt from scratch.
    Recreated,
}
