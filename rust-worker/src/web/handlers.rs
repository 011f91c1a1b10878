//! Notification endpoint handlers.
//!
//! Both POST endpoints take the raw body so the signature can be checked
//! against the exact bytes that were signed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::dispatch::{NotificationDispatcher, NotifyRequest};
use crate::error::NotifyError;
use crate::queue::{Publisher, QueuedInvocation};
use crate::web::signature::{
    is_signature_verification_enabled, verify_invocation_signature, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub publisher: Publisher,
}

impl AppState {
    pub fn new(dispatcher: NotificationDispatcher, publisher: Publisher) -> Self {
        Self {
            config: Arc::new(dispatcher.config().clone()),
            dispatcher: Arc::new(dispatcher),
            publisher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Error and Enqueue Responses
// =============================================================================

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: code,
            message,
        }),
    )
        .into_response()
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        match self {
            NotifyError::InvalidArgument(message) => {
                error_response(StatusCode::BAD_REQUEST, "invalid-argument", message)
            }
            other => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                other.to_string(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub message_id: String,
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Check the signature headers when a signing key is configured.
fn authorize(config: &Config, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    if !is_signature_verification_enabled(&config.invocation_signing_key) {
        return Ok(());
    }
    let signing_key = config.invocation_signing_key.as_deref().unwrap_or_default();

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    };

    if verify_invocation_signature(
        signing_key,
        header(TIMESTAMP_HEADER),
        body,
        header(SIGNATURE_HEADER),
        config.invocation_signature_max_age,
    ) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "invalid or missing invocation signature".to_string(),
        ))
    }
}

fn parse_request(body: &[u8]) -> Result<NotifyRequest, NotifyError> {
    let request: NotifyRequest = serde_json::from_slice(body)
        .map_err(|e| NotifyError::InvalidArgument(format!("invalid JSON body: {}", e)))?;
    request.validate()?;
    Ok(request)
}

// =============================================================================
// Shipment Created
// =============================================================================

/// Run the notification pipeline and return its summary.
pub async fn shipment_created(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!(body_length = body.len(), "shipment_created_received");

    if let Err(rejection) = authorize(&state.config, &headers, &body) {
        warn!("shipment_created_unauthorized");
        return rejection;
    }

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "shipment_created_invalid_request");
            return e.into_response();
        }
    };

    match state.dispatcher.handle(request).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!(error = %e, "shipment_created_failed");
            e.into_response()
        }
    }
}

/// Validate the invocation and publish it for the worker.
pub async fn enqueue_shipment_created(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!(body_length = body.len(), "shipment_created_enqueue_received");

    if let Err(rejection) = authorize(&state.config, &headers, &body) {
        warn!("shipment_created_enqueue_unauthorized");
        return rejection;
    }

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "shipment_created_enqueue_invalid_request");
            return e.into_response();
        }
    };

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let message_id = QueuedInvocation::message_id_for(&request, timestamp_ms);
    let job = QueuedInvocation::new(message_id.clone(), request);

    if let Err(e) = state.publisher.publish_notification(&job).await {
        error!(message_id = %message_id, error = %e, "shipment_created_publish_failed");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "failed to enqueue notification".to_string(),
        );
    }

    info!(message_id = %message_id, "shipment_created_enqueued");

    (
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            status: "enqueued",
            message_id,
        }),
    )
        .into_response()
}
