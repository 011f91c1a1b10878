//! Document download with retries and PDF validation.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use tracing::{info, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::mail::Attachment;
use crate::retry::{retry, RetryPolicy};

/// Base64 encoding of `%PDF`.
pub const PDF_BASE64_MAGIC: &str = "JVBERi";

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Fetch one document and return its base64 content.
///
/// Fails on a non-2xx status, an empty body, or a payload that is not a PDF.
pub async fn fetch_pdf(client: &Client, url: &str, timeout: Duration) -> NotifyResult<String> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| NotifyError::Document(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::Document(format!("unexpected status {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| NotifyError::Document(format!("body read failed: {}", e)))?;

    if bytes.is_empty() {
        return Err(NotifyError::Document("empty body".to_string()));
    }

    let content = BASE64.encode(&bytes);
    if !content.starts_with(PDF_BASE64_MAGIC) {
        return Err(NotifyError::Document(format!(
            "payload is not a PDF ({} bytes)",
            bytes.len()
        )));
    }

    Ok(content)
}

/// Download a document and append it to `attachments`.
///
/// Returns `false` once the policy is spent; the caller decides whether to
/// send without the attachment.
pub async fn download_document_with_retry(
    client: &Client,
    url: &str,
    file_name: &str,
    doc_label: &str,
    policy: &RetryPolicy,
    timeout: Duration,
    attachments: &mut Vec<Attachment>,
) -> bool {
    let result = retry(policy, move |attempt| async move {
        let outcome = fetch_pdf(client, url, timeout).await;
        if let Err(e) = &outcome {
            warn!(
                doc_type = doc_label,
                file_name = file_name,
                attempt = attempt,
                max_attempts = policy.max_attempts,
                error = %e,
                "document_download_attempt_failed"
            );
        }
        outcome
    })
    .await;

    match result {
        Ok(content) => {
            info!(
                doc_type = doc_label,
                file_name = file_name,
                encoded_length = content.len(),
                "document_download_complete"
            );
            attachments.push(Attachment {
                content,
                filename: file_name.to_string(),
                mime_type: PDF_MIME_TYPE.to_string(),
            });
            true
        }
        Err(e) => {
            warn!(
                doc_type = doc_label,
                file_name = file_name,
                error = %e,
                "document_download_failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Backoff::Linear {
                step: Duration::from_millis(1),
            },
        )
    }

    async fn download(url: &str, attachments: &mut Vec<Attachment>) -> bool {
        download_document_with_retry(
            &Client::new(),
            url,
            "SH-1-BOL.pdf",
            "BOL",
            &policy(),
            Duration::from_secs(5),
            attachments,
        )
        .await
    }

    #[tokio::test]
    async fn test_download_succeeds_on_third_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bol.pdf"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bol.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BYTES))
            .expect(1)
            .mount(&server)
            .await;

        let mut attachments = Vec::new();
        let ok = download(&format!("{}/bol.pdf", server.uri()), &mut attachments).await;

        assert!(ok);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "SH-1-BOL.pdf");
        assert_eq!(attachments[0].mime_type, "application/pdf");
        assert!(attachments[0].content.starts_with(PDF_BASE64_MAGIC));
        assert_eq!(BASE64.decode(&attachments[0].content).unwrap(), PDF_BYTES);
    }

    #[tokio::test]
    async fn test_non_pdf_payload_fails_every_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bol.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a pdf</html>"))
            .expect(3)
            .mount(&server)
            .await;

        let mut attachments = Vec::new();
        let ok = download(&format!("{}/bol.pdf", server.uri()), &mut attachments).await;

        assert!(!ok);
        assert!(attachments.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let mut attachments = Vec::new();
        assert!(!download(&format!("{}/empty.pdf", server.uri()), &mut attachments).await);
        assert!(attachments.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_pdf_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_pdf(&Client::new(), &format!("{}/x.pdf", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
