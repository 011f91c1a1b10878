//! Shipment-created notification pipeline.
//!
//! One invocation walks the stages of [`DispatchStage`] in order:
//!
//! ```text
//! verifying_documents → sending_customer → sending_carrier → sending_internal → done
//! ```
//!
//! Every class is attempted regardless of what happened to the previous one;
//! a failing stage is recorded in its [`NotificationResult`] and the pipeline
//! moves on.

pub mod types;

use std::sync::Arc;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::documents::{download_document_with_retry, select_documents, verify_documents};
use crate::error::{NotifyError, NotifyResult};
use crate::mail::{
    Attachment, EmailComposer, EmailContext, MailTransport, OutgoingEmail, SendGridConfig,
    SendGridTransport,
};
use crate::recipients::{resolve_carrier_email, resolve_customer_email, RecipientClass};
use crate::shipment::{DocumentResult, ShipmentData, ShipmentType};
use crate::subscriptions::{
    FirestoreConfig, FirestoreSubscriptionStore, InMemorySubscriptionStore, SubscriptionStore,
    SHIPMENT_CREATED,
};

pub use types::{
    DispatchStage, DispatchSummary, NotificationResult, NotifyRequest, REASON_CANPAR_COURIER,
    REASON_NO_COMPANY, REASON_NO_RECIPIENT, REASON_NO_SUBSCRIBERS,
};

/// Runs the notification pipeline for one shipment at a time.
///
/// Shared between concurrent invocations; holds only immutable state and
/// pooled handles.
pub struct NotificationDispatcher {
    config: Arc<Config>,
    client: Client,
    mailer: Arc<dyn MailTransport>,
    subscriptions: Arc<dyn SubscriptionStore>,
    composer: EmailComposer,
}

impl NotificationDispatcher {
    pub fn new(
        config: Arc<Config>,
        client: Client,
        mailer: Arc<dyn MailTransport>,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> NotifyResult<Self> {
        Ok(Self {
            config,
            client,
            mailer,
            subscriptions,
            composer: EmailComposer::new()?,
        })
    }

    /// Build the production dispatcher: SendGrid for mail, Firestore for
    /// subscriptions when configured.
    pub fn from_config(config: Config) -> NotifyResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(20)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mailer: Arc<dyn MailTransport> = Arc::new(SendGridTransport::new(
            SendGridConfig::from_config(&config)?,
            client.clone(),
        ));

        let subscriptions: Arc<dyn SubscriptionStore> = match FirestoreConfig::from_config(&config)?
        {
            Some(firestore) => {
                info!(project_id = %firestore.project_id, "subscription_store_firestore");
                Arc::new(FirestoreSubscriptionStore::new(firestore, client.clone()))
            }
            None => {
                warn!("subscription_store_not_configured_internal_notifications_disabled");
                Arc::new(InMemorySubscriptionStore::default())
            }
        };

        Self::new(Arc::new(config), client, mailer, subscriptions)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate an invocation and run the pipeline.
    ///
    /// Only a missing `shipmentData` or `documentResults` is an error; every
    /// later problem is reported inside the summary.
    pub async fn handle(&self, request: NotifyRequest) -> NotifyResult<DispatchSummary> {
        let (shipment, documents) = request.into_parts()?;
        Ok(self.dispatch(&shipment, &documents).await)
    }

    /// Run every stage for one shipment.
    pub async fn dispatch(
        &self,
        shipment: &ShipmentData,
        documents: &[DocumentResult],
    ) -> DispatchSummary {
        let shipment_id = shipment.display_id();

        info!(
            shipment_id = %shipment_id,
            shipment_type = ?shipment.shipment_type(),
            creation_method = ?shipment.creation_method,
            document_count = documents.len(),
            mailer = self.mailer.name(),
            "dispatch_start"
        );

        enter(shipment_id, DispatchStage::VerifyingDocuments);
        let report = verify_documents(
            &self.client,
            documents,
            &self.config.verify_policy(),
            self.config.request_timeout(),
        )
        .await;
        if !report.all_accessible() {
            warn!(
                shipment_id = %shipment_id,
                accessible = report.accessible,
                total = report.total,
                "dispatch_continuing_with_inaccessible_documents"
            );
        }

        let mut results = Vec::with_capacity(3);

        enter(shipment_id, DispatchStage::SendingCustomer);
        results.push(settle(
            shipment_id,
            RecipientClass::Customer,
            self.notify_customer(shipment, documents).await,
        ));

        enter(shipment_id, DispatchStage::SendingCarrier);
        results.push(settle(
            shipment_id,
            RecipientClass::Carrier,
            self.notify_carrier(shipment, documents).await,
        ));

        enter(shipment_id, DispatchStage::SendingInternal);
        results.push(settle(
            shipment_id,
            RecipientClass::Internal,
            self.notify_internal(shipment, documents).await,
        ));

        enter(shipment_id, DispatchStage::Done);
        let summary = DispatchSummary::new(shipment_id, results);

        info!(
            shipment_id = %shipment_id,
            message = %summary.message,
            "dispatch_complete"
        );

        summary
    }

    async fn notify_customer(
        &self,
        shipment: &ShipmentData,
        documents: &[DocumentResult],
    ) -> NotifyResult<NotificationResult> {
        let Some(email) = resolve_customer_email(shipment) else {
            warn!(
                shipment_id = %shipment.display_id(),
                "customer_email_missing"
            );
            return Ok(NotificationResult::skipped(
                RecipientClass::Customer,
                REASON_NO_RECIPIENT,
            ));
        };

        let attachments = self
            .collect_attachments(shipment, RecipientClass::Customer, documents)
            .await;
        self.deliver(RecipientClass::Customer, shipment, vec![email], attachments)
            .await
    }

    async fn notify_carrier(
        &self,
        shipment: &ShipmentData,
        documents: &[DocumentResult],
    ) -> NotifyResult<NotificationResult> {
        let shipment_id = shipment.display_id();

        if is_canpar_courier(shipment) {
            info!(
                shipment_id = %shipment_id,
                carrier = ?shipment.carrier_name(),
                "carrier_notification_skipped_canpar"
            );
            return Ok(NotificationResult::skipped(
                RecipientClass::Carrier,
                REASON_CANPAR_COURIER,
            ));
        }

        let email = match resolve_carrier_email(shipment) {
            Some(resolved) => {
                info!(
                    shipment_id = %shipment_id,
                    source = resolved.source(),
                    "carrier_email_resolved"
                );
                resolved.email().to_string()
            }
            None => match &self.config.carrier_fallback_email {
                Some(fallback) => {
                    warn!(
                        shipment_id = %shipment_id,
                        fallback = %fallback,
                        "carrier_email_missing_using_fallback"
                    );
                    fallback.clone()
                }
                None => {
                    warn!(shipment_id = %shipment_id, "carrier_email_missing");
                    return Ok(NotificationResult::skipped(
                        RecipientClass::Carrier,
                        REASON_NO_RECIPIENT,
                    ));
                }
            },
        };

        let attachments = self
            .collect_attachments(shipment, RecipientClass::Carrier, documents)
            .await;
        self.deliver(RecipientClass::Carrier, shipment, vec![email], attachments)
            .await
    }

    async fn notify_internal(
        &self,
        shipment: &ShipmentData,
        documents: &[DocumentResult],
    ) -> NotifyResult<NotificationResult> {
        let shipment_id = shipment.display_id();

        let Some(company_id) = shipment
            .company_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            warn!(shipment_id = %shipment_id, "internal_notification_no_company");
            return Ok(NotificationResult::skipped(
                RecipientClass::Internal,
                REASON_NO_COMPANY,
            ));
        };

        let subscribers = self
            .subscriptions
            .subscribers(company_id, SHIPMENT_CREATED)
            .await?;

        let mut recipients: Vec<String> = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            let email = subscriber.user_email.trim();
            if !email.is_empty() && !recipients.iter().any(|r| r.eq_ignore_ascii_case(email)) {
                recipients.push(email.to_string());
            }
        }

        info!(
            shipment_id = %shipment_id,
            company_id = %company_id,
            store = self.subscriptions.name(),
            subscriber_count = recipients.len(),
            "internal_subscribers_loaded"
        );

        if recipients.is_empty() {
            return Ok(NotificationResult::skipped(
                RecipientClass::Internal,
                REASON_NO_SUBSCRIBERS,
            ));
        }

        let attachments = self
            .collect_attachments(shipment, RecipientClass::Internal, documents)
            .await;
        self.deliver(RecipientClass::Internal, shipment, recipients, attachments)
            .await
    }

    /// Download the documents this class should receive. Failed downloads are
    /// dropped; the message goes out without them.
    async fn collect_attachments(
        &self,
        shipment: &ShipmentData,
        class: RecipientClass,
        documents: &[DocumentResult],
    ) -> Vec<Attachment> {
        let selected = select_documents(shipment.shipment_type(), class, documents);
        let policy = self.config.download_policy();
        let timeout = self.config.request_timeout();
        let mut attachments = Vec::with_capacity(selected.len());

        for document in selected {
            let Some(url) = document.fetchable_url() else {
                warn!(
                    shipment_id = %shipment.display_id(),
                    class = class.as_str(),
                    file_name = document.file_name(),
                    "attachment_url_missing"
                );
                continue;
            };

            download_document_with_retry(
                &self.client,
                url,
                &document.attachment_name(),
                document.kind().label(),
                &policy,
                timeout,
                &mut attachments,
            )
            .await;
        }

        attachments
    }

    /// Render once and send to each recipient in turn.
    async fn deliver(
        &self,
        class: RecipientClass,
        shipment: &ShipmentData,
        recipients: Vec<String>,
        attachments: Vec<Attachment>,
    ) -> NotifyResult<NotificationResult> {
        let context = EmailContext::new(shipment, &attachments);
        let rendered = self.composer.compose(class, &context)?;
        let mut failures = Vec::new();

        for to in &recipients {
            let email = OutgoingEmail {
                to: to.clone(),
                subject: rendered.subject.clone(),
                html: rendered.html.clone(),
                text: rendered.text.clone(),
                attachments: attachments.clone(),
            };

            match self.mailer.send(&email).await {
                Ok(sent) => {
                    info!(
                        shipment_id = %context.shipment_id,
                        class = class.as_str(),
                        to = %to,
                        attachment_count = attachments.len(),
                        message_id = ?sent.message_id,
                        "notification_sent"
                    );
                }
                Err(e) => {
                    error!(
                        shipment_id = %context.shipment_id,
                        class = class.as_str(),
                        to = %to,
                        error = %e,
                        "notification_send_failed"
                    );
                    failures.push(if recipients.len() == 1 {
                        e.to_string()
                    } else {
                        format!("{}: {}", to, e)
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(NotificationResult::sent(class, recipients, context.attachments))
        } else {
            let mut result = NotificationResult::failed(class, failures.join("; "));
            result.recipients = recipients;
            Ok(result)
        }
    }
}

fn enter(shipment_id: &str, stage: DispatchStage) {
    info!(shipment_id = %shipment_id, stage = stage.as_str(), "dispatch_stage");
}

/// Turn a stage error into a recorded failure.
fn settle(
    shipment_id: &str,
    class: RecipientClass,
    outcome: NotifyResult<NotificationResult>,
) -> NotificationResult {
    match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(
                shipment_id = %shipment_id,
                class = class.as_str(),
                error = %e,
                "dispatch_stage_failed"
            );
            NotificationResult::failed(class, e.to_string())
        }
    }
}

fn is_canpar_courier(shipment: &ShipmentData) -> bool {
    shipment.shipment_type() == ShipmentType::Courier
        && shipment
            .carrier_name()
            .is_some_and(|name| name.to_ascii_lowercase().contains("canpar"))
}
