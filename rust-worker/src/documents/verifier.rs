//! Document accessibility polling.
//!
//! Freshly generated documents can take a moment to become readable from
//! storage. Every round sends a HEAD request to each document that has not
//! answered OK yet; rounds stop once all documents are readable or the
//! attempt budget runs out. Exhaustion is logged, never raised.

use std::time::Duration;

use reqwest::Client;
use tracing;

use crate::retry::RetryPolicy;
use crate::shipment::DocumentResult;

/// Outcome of the accessibility polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationReport {
    pub total: usize,
    pub accessible: usize,
    /// Polling rounds actually performed
    pub rounds: u32,
}

impl VerificationReport {
    pub fn all_accessible(&self) -> bool {
        self.accessible == self.total
    }
}

/// Send a HEAD request and report whether it answered with a 2xx status.
pub async fn head_ok(client: &Client, url: &str, timeout: Duration) -> bool {
    match client.head(url).timeout(timeout).send().await {
        Ok(resp) => {
            let status = resp.status();
            tracing::debug!(
                url = url,
                status_code = status.as_u16(),
                "document_head_complete"
            );
            status.is_success()
        }
        Err(e) => {
            if e.is_timeout() {
                tracing::warn!(
                    url = url,
                    timeout_seconds = timeout.as_secs_f64(),
                    error = %e,
                    "document_head_timeout"
                );
            } else {
                tracing::warn!(url = url, error = %e, "document_head_error");
            }
            false
        }
    }
}

/// Poll every document until all are accessible or the policy is spent.
///
/// Documents without a success flag or without an http(s) URL never become
/// accessible and cost no network call.
pub async fn verify_documents(
    client: &Client,
    documents: &[DocumentResult],
    policy: &RetryPolicy,
    timeout: Duration,
) -> VerificationReport {
    let total = documents.len();
    let mut pending: Vec<&DocumentResult> = documents.iter().collect();
    let mut rounds = 0;

    if pending.is_empty() {
        tracing::info!("document_verification_skipped_no_documents");
        return VerificationReport {
            total,
            accessible: 0,
            rounds,
        };
    }

    tracing::info!(
        document_count = total,
        max_attempts = policy.max_attempts,
        "document_verification_start"
    );

    for attempt in 1..=policy.max_attempts {
        rounds = attempt;
        let mut still_pending = Vec::with_capacity(pending.len());

        for document in pending {
            let accessible = match document.fetchable_url() {
                Some(url) => head_ok(client, url, timeout).await,
                None => false,
            };
            if !accessible {
                still_pending.push(document);
            }
        }

        pending = still_pending;

        tracing::info!(
            attempt = attempt,
            accessible = total - pending.len(),
            pending = pending.len(),
            "document_verification_round"
        );

        if pending.is_empty() {
            break;
        }
        if attempt < policy.max_attempts {
            policy.wait(attempt).await;
        }
    }

    let report = VerificationReport {
        total,
        accessible: total - pending.len(),
        rounds,
    };

    if report.all_accessible() {
        tracing::info!(
            document_count = total,
            rounds = rounds,
            "document_verification_complete"
        );
    } else {
        tracing::warn!(
            document_count = total,
            accessible = report.accessible,
            rounds = rounds,
            inaccessible_files = ?pending.iter().map(|d| d.file_name()).collect::<Vec<_>>(),
            "document_verification_exhausted"
        );
    }

    report
}
