//! Delivery status fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use beacon_core::models::DeliveryStatus;
use beacon_core::traits::IDeliveryListener;

/// Listeners registered by the host. Notification must never take the
/// worker down, so a panicking listener is caught, logged and skipped;
/// the remaining listeners still run.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn IDeliveryListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn IDeliveryListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub fn notify(&self, status: &DeliveryStatus) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_delivery(status)));
            if result.is_err() {
                tracing::warn!("dispatch: delivery listener panicked");
            }
        }
    }
}
