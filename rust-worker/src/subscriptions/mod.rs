//! Notification subscription lookups for internal recipients.

pub mod firestore;
pub mod token;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotifyResult;

pub use firestore::{FirestoreConfig, FirestoreSubscriptionStore};
pub use token::{FirestoreCredentials, ServiceAccountKey, TokenSource};

/// Notification type for shipment creation.
pub const SHIPMENT_CREATED: &str = "shipment_created";

/// A user subscribed to a company's notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub user_email: String,
    pub user_id: Option<String>,
}

/// Query interface over the subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Enabled subscribers of `company_id` for `notification_type`.
    async fn subscribers(
        &self,
        company_id: &str,
        notification_type: &str,
    ) -> NotifyResult<Vec<Subscriber>>;

    /// Store name for logging.
    fn name(&self) -> &'static str;
}

/// A stored subscription record.
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub company_id: String,
    pub notification_type: String,
    pub enabled: bool,
    pub subscriber: Subscriber,
}

impl SubscriptionRecord {
    pub fn enabled(company_id: &str, notification_type: &str, user_email: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            notification_type: notification_type.to_string(),
            enabled: true,
            subscriber: Subscriber {
                user_email: user_email.to_string(),
                user_id: None,
            },
        }
    }
}

/// Subscription store backed by a fixed list of records.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    records: Vec<SubscriptionRecord>,
}

impl InMemorySubscriptionStore {
    pub fn new(records: Vec<SubscriptionRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn subscribers(
        &self,
        company_id: &str,
        notification_type: &str,
    ) -> NotifyResult<Vec<Subscriber>> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.enabled
                    && r.company_id == company_id
                    && r.notification_type == notification_type
            })
            .map(|r| r.subscriber.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
