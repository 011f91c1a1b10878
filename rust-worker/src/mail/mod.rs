//! Outgoing mail: message types, the transport seam, and templates.
//!
//! ## Transports
//!
//! - [`SendGridTransport`]: SendGrid v3 HTTP API
//! - [`RecordingTransport`]: keeps messages in memory (tests, dry runs)

pub mod compose;
pub mod sendgrid;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{NotifyError, NotifyResult};

pub use compose::{EmailComposer, EmailContext, RenderedEmail};
pub use sendgrid::{SendGridConfig, SendGridTransport};

/// A file attached to one outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Base64-encoded file content
    pub content: String,
    pub filename: String,
    pub mime_type: String,
}

/// A message ready for the transport.
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Provider acknowledgement for a sent message.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub message_id: Option<String>,
}

/// Anything that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> NotifyResult<SentEmail>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Transport that records messages instead of delivering them.
///
/// Addresses listed in `failing` are rejected with a transport error.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failing: Arc<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message addressed to one of `addresses`.
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Arc::default(),
            failing: Arc::new(addresses.iter().map(|a| a.to_string()).collect()),
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| e.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> NotifyResult<SentEmail> {
        if self.failing.iter().any(|a| a == &email.to) {
            return Err(NotifyError::Transport(format!(
                "recipient rejected: {}",
                email.to
            )));
        }

        let mut sent = self.sent.lock().await;
        sent.push(email.clone());
        Ok(SentEmail {
            message_id: Some(format!("recorded-{}", sent.len())),
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "Subject".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_recording_transport_records() {
        let transport = RecordingTransport::new();
        let sent = transport.send(&email("a@example.com")).await.unwrap();
        assert_eq!(sent.message_id.as_deref(), Some("recorded-1"));
        assert_eq!(transport.sent().await.len(), 1);
        assert_eq!(transport.sent_to("a@example.com").await.len(), 1);
    }

    #[tokio::test]
    async fn test_recording_transport_failing_address() {
        let transport = RecordingTransport::failing_for(&["bad@example.com"]);
        assert!(transport.send(&email("bad@example.com")).await.is_err());
        assert!(transport.send(&email("ok@example.com")).await.is_ok());
        assert_eq!(transport.sent().await.len(), 1);
    }
}
