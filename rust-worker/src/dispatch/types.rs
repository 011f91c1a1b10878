//! Invocation payload and result types.

use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, NotifyResult};
use crate::recipients::RecipientClass;
use crate::shipment::{DocumentResult, ShipmentData};

/// Carrier skipped for a Canpar courier shipment.
pub const REASON_CANPAR_COURIER: &str = "canpar_courier_shipment";
/// No address could be resolved for the class.
pub const REASON_NO_RECIPIENT: &str = "no_recipient";
/// Internal class without a company to look subscribers up for.
pub const REASON_NO_COMPANY: &str = "no_company_id";
/// Internal class with zero enabled subscribers.
pub const REASON_NO_SUBSCRIBERS: &str = "no_subscribers";

/// Body of a shipment-created notification invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotifyRequest {
    pub shipment_data: Option<ShipmentData>,
    pub document_results: Option<Vec<DocumentResult>>,
}

impl NotifyRequest {
    pub fn new(shipment_data: ShipmentData, document_results: Vec<DocumentResult>) -> Self {
        Self {
            shipment_data: Some(shipment_data),
            document_results: Some(document_results),
        }
    }

    /// Check that both required fields are present.
    pub fn validate(&self) -> NotifyResult<()> {
        if self.shipment_data.is_none() {
            return Err(NotifyError::InvalidArgument(
                "shipmentData is required".to_string(),
            ));
        }
        if self.document_results.is_none() {
            return Err(NotifyError::InvalidArgument(
                "documentResults is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_parts(self) -> NotifyResult<(ShipmentData, Vec<DocumentResult>)> {
        self.validate()?;
        match (self.shipment_data, self.document_results) {
            (Some(shipment), Some(documents)) => Ok((shipment, documents)),
            _ => Err(NotifyError::InvalidArgument(
                "shipmentData and documentResults are required".to_string(),
            )),
        }
    }
}

/// Outcome of one recipient class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResult {
    #[serde(rename = "type")]
    pub class: RecipientClass,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl NotificationResult {
    pub fn sent(class: RecipientClass, recipients: Vec<String>, attachments: Vec<String>) -> Self {
        Self {
            class,
            success: true,
            error: None,
            skipped: false,
            reason: None,
            recipients,
            attachments,
        }
    }

    pub fn skipped(class: RecipientClass, reason: &str) -> Self {
        Self {
            class,
            success: true,
            error: None,
            skipped: true,
            reason: Some(reason.to_string()),
            recipients: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn failed(class: RecipientClass, error: String) -> Self {
        Self {
            class,
            success: false,
            error: Some(error),
            skipped: false,
            reason: None,
            recipients: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

/// Response of a completed invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub message: String,
    pub results: Vec<NotificationResult>,
}

impl DispatchSummary {
    pub fn new(shipment_id: &str, results: Vec<NotificationResult>) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.iter().filter(|r| !r.success).count();
        let sent = results.len() - skipped - failed;

        Self {
            success: true,
            message: format!(
                "Notifications processed for shipment {}: {} sent, {} skipped, {} failed",
                shipment_id, sent, skipped, failed
            ),
            results,
        }
    }

    pub fn result(&self, class: RecipientClass) -> Option<&NotificationResult> {
        self.results.iter().find(|r| r.class == class)
    }
}

/// Pipeline stages, entered in declaration order exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    VerifyingDocuments,
    SendingCustomer,
    SendingCarrier,
    SendingInternal,
    Done,
}

impl DispatchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchStage::VerifyingDocuments => "verifying_documents",
            DispatchStage::SendingCustomer => "sending_customer",
            DispatchStage::SendingCarrier => "sending_carrier",
            DispatchStage::SendingInternal => "sending_internal",
            DispatchStage::Done => "done",
        }
    }
}
