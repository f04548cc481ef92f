//! Per-delivery dispatch: decode, route by topic, invoke the handler, and
//! decide the terminal acknowledgment. Kept free of transport types so the
//! policy is testable without a broker.

use futures::FutureExt;
use tracing::{error, warn};

use uq_common::ReceivedEnvelope;

use crate::registry::HandlerRegistry;

/// Terminal verdict on a delivery. `Reject` never requeues: failed and
/// unroutable messages are dropped, not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchOutcome {
    Ack,
    Reject,
}

pub(crate) async fn dispatch_delivery(registry: &HandlerRegistry, data: &[u8]) -> DispatchOutcome {
    let envelope = match ReceivedEnvelope::from_bytes(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Failed to decode delivery, rejecting without requeue");
            return DispatchOutcome::Reject;
        }
    };

    let handler = match registry.get(&envelope.topic) {
        Some(handler) => handler,
        None => {
            warn!(topic = %envelope.topic, "No handler registered for topic, rejecting without requeue");
            return DispatchOutcome::Reject;
        }
    };

    let payload = match envelope.payload_bytes() {
        Ok(payload) => payload,
        Err(e) => {
            error!(topic = %envelope.topic, error = %e, "Failed to extract payload, rejecting without requeue");
            return DispatchOutcome::Reject;
        }
    };

    // catch_unwind keeps a panicking handler from killing its worker; the
    // delivery is rejected like any other handler failure.
    match std::panic::AssertUnwindSafe(handler.handle(&payload))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => DispatchOutcome::Ack,
        Ok(Err(e)) => {
            error!(topic = %envelope.topic, error = %e, "Handler failed, rejecting without requeue");
            DispatchOutcome::Reject
        }
        Err(_) => {
            error!(topic = %envelope.topic, "Handler panicked, rejecting without requeue");
            DispatchOutcome::Reject
        }
    }
}
