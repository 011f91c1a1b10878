//! Firestore-backed subscription store.
//!
//! Uses the REST `runQuery` endpoint against the `notificationSubscriptions`
//! collection with three equality filters.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::token::{FirestoreCredentials, ServiceAccountKey, TokenSource, GOOGLE_TOKEN_URL};
use super::{Subscriber, SubscriptionStore};
use crate::config::Config;
use crate::error::{NotifyError, NotifyResult};

/// Collection holding subscription documents.
pub const SUBSCRIPTIONS_COLLECTION: &str = "notificationSubscriptions";

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub credentials: FirestoreCredentials,
    pub base_url: String,
}

impl FirestoreConfig {
    /// `Ok(None)` when no Firestore project is configured. A service account
    /// key takes precedence over a static access token.
    pub fn from_config(config: &Config) -> NotifyResult<Option<Self>> {
        let Some(project_id) = config.firestore_project_id.clone() else {
            return Ok(None);
        };

        let credentials = if let Some(encoded) = &config.firestore_service_account_key {
            let key = ServiceAccountKey::from_base64(encoded)?;
            let token_url = config
                .firestore_token_url
                .clone()
                .or_else(|| key.token_uri.clone())
                .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());
            FirestoreCredentials::ServiceAccount { key, token_url }
        } else if let Some(token) = &config.firestore_access_token {
            FirestoreCredentials::AccessToken(token.clone())
        } else {
            return Err(NotifyError::Config(
                "FIRESTORE_PROJECT_ID is set without credentials".to_string(),
            ));
        };

        Ok(Some(Self {
            project_id,
            credentials,
            base_url: config.firestore_base_url.trim_end_matches('/').to_string(),
        }))
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:runQuery",
            self.base_url, self.project_id
        )
    }
}

pub struct FirestoreSubscriptionStore {
    config: FirestoreConfig,
    client: Client,
    tokens: TokenSource,
}

impl FirestoreSubscriptionStore {
    pub fn new(config: FirestoreConfig, client: Client) -> Self {
        let tokens = TokenSource::new(config.credentials.clone(), client.clone());
        Self {
            config,
            client,
            tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

#[derive(Debug, Deserialize)]
struct FirestoreValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
}

impl FirestoreDocument {
    fn string_field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.string_value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn equal_filter(field: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": "EQUAL",
            "value": value
        }
    })
}

fn subscription_query(company_id: &str, notification_type: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": SUBSCRIPTIONS_COLLECTION }],
            "where": {
                "compositeFilter": {
                    "op": "AND",
                    "filters": [
                        equal_filter("companyId", json!({ "stringValue": company_id })),
                        equal_filter("notificationType", json!({ "stringValue": notification_type })),
                        equal_filter("enabled", json!({ "booleanValue": true })),
                    ]
                }
            }
        }
    })
}

#[async_trait]
impl SubscriptionStore for FirestoreSubscriptionStore {
    async fn subscribers(
        &self,
        company_id: &str,
        notification_type: &str,
    ) -> NotifyResult<Vec<Subscriber>> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(self.config.run_query_url())
            .bearer_auth(&token)
            .json(&subscription_query(company_id, notification_type))
            .send()
            .await
            .map_err(|e| NotifyError::Store(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status_code = status.as_u16(), "firestore_token_rejected");
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                company_id = %company_id,
                status_code = status.as_u16(),
                error = %body,
                "firestore_query_failed"
            );
            return Err(NotifyError::Store(format!(
                "runQuery returned {}: {}",
                status, body
            )));
        }

        let rows: Vec<RunQueryRow> = response
            .json()
            .await
            .map_err(|e| NotifyError::Store(format!("invalid runQuery response: {}", e)))?;

        let subscribers: Vec<Subscriber> = rows
            .into_iter()
            .filter_map(|row| row.document)
            .filter_map(|doc| {
                Some(Subscriber {
                    user_email: doc.string_field("userEmail")?,
                    user_id: doc.string_field("userId"),
                })
            })
            .collect();

        debug!(
            company_id = %company_id,
            notification_type = %notification_type,
            subscriber_count = subscribers.len(),
            "firestore_query_complete"
        );

        Ok(subscribers)
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}
