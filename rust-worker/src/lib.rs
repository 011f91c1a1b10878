//! Shipnotify - shipment-created email notifications.
//!
//! This library provides shared modules for the two binaries:
//! - `shipnotify-web`: HTTP endpoints that run or enqueue the pipeline
//! - `shipnotify-worker`: RabbitMQ consumer that runs enqueued invocations
//!
//! ## Architecture
//!
//! ```text
//! HTTP ─┬─────────────────────────────────────────→ NotificationDispatcher
//!       └→ shipment_notifications queue → Worker ─→ NotificationDispatcher
//!
//! NotificationDispatcher: verify documents → customer → carrier → internal
//! ```

pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod mail;
pub mod queue;
pub mod recipients;
pub mod retry;
pub mod shipment;
pub mod subscriptions;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{DispatchSummary, NotificationDispatcher, NotificationResult, NotifyRequest};
pub use error::{NotifyError, NotifyResult};
pub use mail::{MailTransport, RecordingTransport, SendGridTransport};
pub use queue::{Publisher, QueuedInvocation, NOTIFICATION_QUEUE};
pub use recipients::RecipientClass;
pub use shipment::{DocumentKind, DocumentResult, ShipmentData};
pub use subscriptions::{InMemorySubscriptionStore, SubscriptionStore};
pub use web::AppState;
