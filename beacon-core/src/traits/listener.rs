use crate::models::DeliveryStatus;

/// Host callback for delivery progress. Invoked on the dispatch thread;
/// implementations should return quickly and must not call back into
/// the client.
pub trait IDeliveryListener: Send + Sync {
    fn on_delivery(&self, status: &DeliveryStatus);
}
