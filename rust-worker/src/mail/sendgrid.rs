//! SendGrid mail transport.
//!
//! Sends messages through the v3 `mail/send` endpoint, including PDF
//! attachments.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{MailTransport, OutgoingEmail, SentEmail};
use crate::config::Config;
use crate::error::{NotifyError, NotifyResult};

/// SendGrid API configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    /// API base URL without the `/mail/send` suffix
    pub api_url: String,
}

impl SendGridConfig {
    pub fn from_config(config: &Config) -> NotifyResult<Self> {
        let api_key = config
            .sendgrid_api_key
            .clone()
            .ok_or_else(|| NotifyError::Config("SENDGRID_API_KEY not set".to_string()))?;

        Ok(Self {
            api_key,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            api_url: config.sendgrid_api_url.trim_end_matches('/').to_string(),
        })
    }
}

pub struct SendGridTransport {
    config: SendGridConfig,
    client: Client,
}

impl SendGridTransport {
    pub fn new(config: SendGridConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SendGridAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendGridAttachment<'a> {
    content: &'a str,
    filename: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
    disposition: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendGridError {
    errors: Vec<SendGridErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorDetail {
    message: String,
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn send(&self, email: &OutgoingEmail) -> NotifyResult<SentEmail> {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: &email.to,
                    name: None,
                }],
            }],
            from: EmailAddress {
                email: &self.config.from_email,
                name: Some(&self.config.from_name),
            },
            subject: &email.subject,
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: &email.text,
                },
                Content {
                    content_type: "text/html",
                    value: &email.html,
                },
            ],
            attachments: email
                .attachments
                .iter()
                .map(|a| SendGridAttachment {
                    content: &a.content,
                    filename: &a.filename,
                    mime_type: &a.mime_type,
                    disposition: "attachment",
                })
                .collect(),
        };

        debug!(
            to = %email.to,
            subject = %email.subject,
            attachment_count = email.attachments.len(),
            "sendgrid_send_starting"
        );

        let response = self
            .client
            .post(format!("{}/mail/send", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_success() {
            info!(
                to = %email.to,
                message_id = ?message_id,
                "sendgrid_send_complete"
            );
            return Ok(SentEmail { message_id });
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            to = %email.to,
            status_code = status.as_u16(),
            error = %body,
            "sendgrid_send_failed"
        );

        let detail = match serde_json::from_str::<SendGridError>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join(", "),
            _ => body,
        };

        Err(NotifyError::Transport(format!(
            "SendGrid error ({}): {}",
            status, detail
        )))
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}
