//! HTTP surface for shipment notifications.
//!
//! - `POST /notifications/shipment-created`: run the pipeline and return the
//!   per-class results
//! - `POST /notifications/shipment-created/enqueue`: validate and hand the
//!   invocation to the worker through RabbitMQ
//! - `GET /health`

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    enqueue_shipment_created, health, shipment_created, AppState, EnqueueResponse, ErrorResponse,
    HealthResponse,
};
pub use signature::{
    is_signature_verification_enabled, sign_invocation, verify_invocation_signature,
};

/// Build the router with all routes and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notifications/shipment-created", post(shipment_created))
        .route(
            "/notifications/shipment-created/enqueue",
            post(enqueue_shipment_created),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
