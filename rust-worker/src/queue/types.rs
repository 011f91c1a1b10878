//! Queue message types.

use serde::{Deserialize, Serialize};

use crate::dispatch::NotifyRequest;

/// Queue name for deferred shipment-created invocations.
pub const NOTIFICATION_QUEUE: &str = "shipment_notifications";

/// An invocation waiting in the notification queue.
///
/// The body is the same JSON the synchronous endpoint accepts, plus a
/// `messageId` for tracing the message through the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedInvocation {
    pub message_id: String,
    #[serde(flatten)]
    pub request: NotifyRequest,
}

impl QueuedInvocation {
    pub fn new(message_id: String, request: NotifyRequest) -> Self {
        Self {
            message_id,
            request,
        }
    }

    /// Message id derived from the shipment, e.g. `shipment-SH-1-1700000000000`.
    pub fn message_id_for(request: &NotifyRequest, timestamp_ms: u128) -> String {
        let shipment_id = request
            .shipment_data
            .as_ref()
            .map(|s| s.display_id())
            .unwrap_or("unknown");
        format!("shipment-{}-{}", shipment_id, timestamp_ms)
    }
}
