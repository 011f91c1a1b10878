//! Async RabbitMQ publisher for deferred invocations.
//!
//! The publisher is shared across request handlers and reconnects lazily
//! when its channel drops.

use std::sync::Arc;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{QueuedInvocation, NOTIFICATION_QUEUE};

/// Declare the notification queue (idempotent).
pub async fn declare_notification_queue(channel: &Channel) -> Result<()> {
    channel
        .queue_declare(
            NOTIFICATION_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare notification queue")?;
    Ok(())
}

/// RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    async fn ensure_connected(&self) -> Result<Channel> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        declare_notification_queue(&ch).await?;

        info!(queue = NOTIFICATION_QUEUE, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish an invocation to the shipment_notifications queue.
    pub async fn publish_notification(&self, job: &QueuedInvocation) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(job).context("Failed to serialize invocation")?;

        channel
            .basic_publish(
                "",
                NOTIFICATION_QUEUE,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(job.message_id.clone().into()),
            )
            .await
            .context("Failed to publish to notification queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            queue = NOTIFICATION_QUEUE,
            message_id = %job.message_id,
            body_length = body.len(),
            "rabbitmq_notification_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_starts_disconnected() {
        let publisher = Publisher::new("amqp://localhost:5672".to_string());
        assert!(publisher.inner.channel.read().await.is_none());
        assert!(publisher.inner.connection.read().await.is_none());
    }
}
