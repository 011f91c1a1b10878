//! Queue module for RabbitMQ operations.
//!
//! ```text
//! POST .../enqueue → shipment_notifications queue → Worker → NotificationDispatcher
//! ```

pub mod publisher;
pub mod types;

pub use publisher::{declare_notification_queue, Publisher};
pub use types::{QueuedInvocation, NOTIFICATION_QUEUE};
