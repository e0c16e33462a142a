//! Profile attribute management over the typed key-value store.

use std::sync::{Arc, Mutex};

use beacon_core::constants::PROFILE_KEY_PREFIX;
use beacon_core::errors::{BeaconResult, StorageError};
use beacon_core::models::AttributeValue;
use beacon_core::traits::IKeyValueStorage;

/// Outcome of a profile mutation. A kind conflict is a signal, not an
/// error; the caller decides whether to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeUpdate {
    /// Written; carries the value now stored.
    Applied { current: AttributeValue },
    /// The key already holds a different kind. Nothing was written.
    TypeMismatch { previous: AttributeValue },
}

/// Applies typed profile mutations under the `profile.` namespace.
///
/// Counters accumulate (`Counter(n)` adds `n`) and string sets union;
/// text and bool values overwrite. The first write establishes a key's
/// kind; later mutations of another kind are kept-previous no-ops.
pub struct ProfileWriter {
    kv: Arc<dyn IKeyValueStorage>,
    // Serializes check-then-write so two racing mutations cannot
    // interleave between the kind check and the store call.
    write_lock: Mutex<()>,
}

impl ProfileWriter {
    pub fn new(kv: Arc<dyn IKeyValueStorage>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Apply one mutation. See the type-level docs for the per-kind
    /// semantics.
    pub fn set(&self, key: &str, value: &AttributeValue) -> BeaconResult<AttributeUpdate> {
        let full_key = namespaced(key);
        let _guard = self.write_lock.lock().map_err(|_| {
            StorageError::SqliteError {
                message: "profile write lock poisoned".to_string(),
            }
        })?;

        if let Some(previous) = self.kv.get(&full_key)? {
            if previous.kind() != value.kind() {
                tracing::debug!(
                    key,
                    stored = previous.kind(),
                    requested = value.kind(),
                    "profile: kept previous value on kind mismatch"
                );
                return Ok(AttributeUpdate::TypeMismatch { previous });
            }
        }

        let current = match value {
            AttributeValue::Counter(delta) => {
                AttributeValue::Counter(self.kv.increment(&full_key, *delta)?)
            }
            AttributeValue::StringSet(items) => {
                let items: Vec<String> = items.iter().cloned().collect();
                self.kv.merge_set(&full_key, &items)?;
                match self.kv.get(&full_key)? {
                    Some(merged) => merged,
                    None => value.clone(),
                }
            }
            AttributeValue::Text(_) | AttributeValue::Bool(_) => {
                self.kv.put(&full_key, value)?;
                value.clone()
            }
        };
        Ok(AttributeUpdate::Applied { current })
    }

    /// Read an attribute back.
    pub fn get(&self, key: &str) -> BeaconResult<Option<AttributeValue>> {
        self.kv.get(&namespaced(key))
    }

    /// Remove an attribute. Returns whether it existed.
    pub fn remove(&self, key: &str) -> BeaconResult<bool> {
        self.kv.delete(&namespaced(key))
    }
}

fn namespaced(key: &str) -> String {
    format!("{PROFILE_KEY_PREFIX}{key}")
}
