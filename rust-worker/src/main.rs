//! Shipnotify Worker - RabbitMQ consumer for deferred shipment notifications.
//!
//! Runs the notification pipeline for every invocation published to the
//! shipment_notifications queue.

mod consumer;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shipnotify::{Config, NotificationDispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("worker_starting");

    let config = Config::from_env();
    tracing::info!(
        cloudamqp_url_set = !config.cloudamqp_url.is_empty(),
        sendgrid_configured = config.sendgrid_api_key.is_some(),
        firestore_configured = config.firestore_project_id.is_some(),
        carrier_fallback_set = config.carrier_fallback_email.is_some(),
        concurrency = config.worker_concurrency,
        "config_loaded"
    );

    let dispatcher = NotificationDispatcher::from_config(config)?;

    consumer::run(dispatcher).await?;

    Ok(())
}
