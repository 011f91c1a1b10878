//! RabbitMQ consumer module using lapin.
//!
//! Consumes deferred invocations from the shipment_notifications queue and
//! spawns a task per message that runs the notification pipeline. In-flight
//! tasks are awaited on shutdown so their messages still get acked.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};
use tokio::{signal, task::JoinError, task::JoinSet};
use tracing::{error, info, warn};

use shipnotify::queue::declare_notification_queue;
use shipnotify::{NotificationDispatcher, QueuedInvocation, NOTIFICATION_QUEUE};

/// Run the RabbitMQ consumer until SIGINT/SIGTERM or the consumer closes.
///
/// Messages are acked once the pipeline has run, whatever the per-class
/// outcome. Payloads that cannot be parsed or lack a required field are
/// nacked without requeue.
pub async fn run(dispatcher: NotificationDispatcher) -> Result<()> {
    let dispatcher = Arc::new(dispatcher);
    let config = dispatcher.config();

    info!(url_length = config.cloudamqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.cloudamqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn.create_channel().await.context("Failed to create channel")?;

    info!("rabbitmq_channel_created");

    let prefetch_count = config.worker_concurrency.clamp(1, u16::MAX as usize) as u16;
    channel
        .basic_qos(prefetch_count, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = prefetch_count, "rabbitmq_qos_set");

    declare_notification_queue(&channel).await?;

    info!(queue = NOTIFICATION_QUEUE, "rabbitmq_queue_declared");

    let mut consumer = channel
        .basic_consume(
            NOTIFICATION_QUEUE,
            "shipnotify-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = NOTIFICATION_QUEUE, "rabbitmq_consumer_started");
    info!("worker_ready");

    let channel = Arc::new(channel);

    let shutdown = async {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "ctrl_c_handler_failed");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "sigterm_handler_failed");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }
    };

    tokio::pin!(shutdown);

    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = finished {
                    log_task_failure(&e);
                }
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let delivery_tag = delivery.delivery_tag;
                        let message_id = delivery
                            .properties
                            .message_id()
                            .as_ref()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string());

                        info!(
                            queue = NOTIFICATION_QUEUE,
                            message_id = %message_id,
                            delivery_tag = delivery_tag,
                            "rabbitmq_job_received"
                        );

                        let dispatcher = Arc::clone(&dispatcher);
                        let channel = Arc::clone(&channel);

                        tasks.spawn(async move {
                            handle_delivery(&dispatcher, &channel, delivery_tag, &message_id, &delivery.data).await;
                        });
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    info!(in_flight = tasks.len(), "worker_draining");
    let completed = drain_tasks(&mut tasks).await;
    info!(completed = completed, "worker_shutdown_complete");
    Ok(())
}

/// Wait for every in-flight task. Returns how many finished without panicking.
async fn drain_tasks(tasks: &mut JoinSet<()>) -> usize {
    let mut completed = 0;
    while let Some(finished) = tasks.join_next().await {
        match finished {
            Ok(()) => completed += 1,
            Err(e) => log_task_failure(&e),
        }
    }
    completed
}

fn log_task_failure(e: &JoinError) {
    error!(error = %e, panicked = e.is_panic(), "worker_task_failed");
}

async fn handle_delivery(
    dispatcher: &NotificationDispatcher,
    channel: &Channel,
    delivery_tag: u64,
    message_id: &str,
    data: &[u8],
) {
    let job: QueuedInvocation = match serde_json::from_slice(data) {
        Ok(job) => job,
        Err(e) => {
            error!(
                message_id = %message_id,
                error = %e,
                "rabbitmq_job_parse_failed"
            );
            reject(channel, delivery_tag).await;
            return;
        }
    };

    match dispatcher.handle(job.request).await {
        Ok(summary) => {
            info!(
                message_id = %job.message_id,
                message = %summary.message,
                "worker_dispatch_complete"
            );

            if let Err(e) = channel
                .basic_ack(delivery_tag, BasicAckOptions::default())
                .await
            {
                error!(
                    delivery_tag = delivery_tag,
                    error = %e,
                    "rabbitmq_ack_failed"
                );
            } else {
                info!(
                    queue = NOTIFICATION_QUEUE,
                    message_id = %job.message_id,
                    "rabbitmq_job_completed"
                );
            }
        }
        Err(e) => {
            error!(
                message_id = %job.message_id,
                error = %e,
                "worker_invocation_rejected"
            );
            reject(channel, delivery_tag).await;
        }
    }
}

/// Nack without requeue; a malformed payload will not get better.
async fn reject(channel: &Channel, delivery_tag: u64) {
    if let Err(e) = channel
        .basic_nack(
            delivery_tag,
            BasicNackOptions {
                requeue: false,
                ..Default::default()
            },
        )
        .await
    {
        error!(
            delivery_tag = delivery_tag,
            error = %e,
            "rabbitmq_nack_failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_tasks() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for delay_ms in [30u64, 10, 20] {
            let done = Arc::clone(&done);
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        tasks.spawn(async { panic!("dispatch blew up") });

        let completed = drain_tasks(&mut tasks).await;

        assert_eq!(completed, 3);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(tasks.is_empty());
    }
}
