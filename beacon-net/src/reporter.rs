//! The report uploader.
//!
//! Takes a claimed batch, wraps it in an envelope and posts it. The
//! HTTP status is the only classification input; response bodies are
//! parsed for an error description and logged, never acted on.

use std::sync::Arc;

use beacon_core::events::Batch;
use beacon_core::models::DeliveryOutcome;
use beacon_core::traits::{IClock, ITransport};

use crate::envelope::{EnvelopeContext, ReportEnvelope, WireEvent};

pub struct Reporter {
    transport: Arc<dyn ITransport>,
    endpoint_url: String,
    context: EnvelopeContext,
    clock: Arc<dyn IClock>,
}

impl Reporter {
    pub fn new(
        transport: Arc<dyn ITransport>,
        endpoint_url: String,
        context: EnvelopeContext,
        clock: Arc<dyn IClock>,
    ) -> Self {
        Self {
            transport,
            endpoint_url,
            context,
            clock,
        }
    }

    /// Upload one batch and classify the result. Never touches the
    /// queue; the dispatcher decides what happens to the events.
    pub fn send(&self, batch: &Batch) -> DeliveryOutcome {
        let events: Vec<WireEvent> = batch.events.iter().map(WireEvent::from).collect();
        let envelope = ReportEnvelope::new(&self.context, self.clock.now_ms(), events);
        let body = envelope.encode();
        tracing::debug!(
            events = batch.len(),
            bytes = body.len(),
            "net: posting report"
        );

        match self.transport.post(&self.endpoint_url, &body) {
            Ok(response) => {
                let outcome = classify_status(response.status);
                match outcome {
                    DeliveryOutcome::Success => {
                        tracing::debug!(status = response.status, "net: report accepted");
                    }
                    _ => {
                        tracing::warn!(
                            status = response.status,
                            error = error_description(&response.body).as_deref(),
                            ?outcome,
                            "net: report rejected"
                        );
                    }
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, "net: report transport failed");
                DeliveryOutcome::TransientFailure
            }
        }
    }
}

/// Map an HTTP status to an outcome. Auth failures (401/407) count as
/// transient: mobile keys get rotated server-side and recover without
/// a reinstall, so the events are kept.
pub fn classify_status(status: u16) -> DeliveryOutcome {
    match status {
        200..=299 => DeliveryOutcome::Success,
        401 | 407 | 408 | 429 => DeliveryOutcome::TransientFailure,
        500..=599 => DeliveryOutcome::TransientFailure,
        400..=499 => DeliveryOutcome::PermanentFailure,
        _ => DeliveryOutcome::TransientFailure,
    }
}

/// Pull a human-readable error out of a JSON response body, if any.
fn error_description(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))?
        .as_str()
        .map(str::to_string)
}
