use std::time::Duration;

use axum::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{EventPublisher, LifecycleEvent};
use crate::config::AmqpConfig;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

struct Bus {
    connection: Connection,
    channel: Channel,
}

/// AMQP-backed publisher. The connection is established lazily on first
/// publish and reused across requests; the mutex makes concurrent first-use a
/// single connect. A failed send drops the cached connection so the next
/// publish reconnects.
pub struct AmqpPublisher {
    config: AmqpConfig,
    bus: Mutex<Option<Bus>>,
}

impl AmqpPublisher {
    pub fn new(config: AmqpConfig) -> Self {
        Self {
            config,
            bus: Mutex::new(None),
        }
    }

    async fn connect(&self) -> anyhow::Result<Bus> {
        let connection =
            Connection::connect(&self.config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        info!(queue = %self.config.queue, "connected to message bus");
        Ok(Bus {
            connection,
            channel,
        })
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, event: LifecycleEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(&event)?;

        let mut guard = self.bus.lock().await;
        if let Some(bus) = guard.as_ref() {
            if !bus.channel.status().connected() {
                warn!("bus connection lost, reconnecting");
                *guard = None;
            }
        }
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let channel = guard.as_ref().unwrap().channel.clone();
        drop(guard);

        let result = channel
            .basic_publish(
                "",
                &self.config.queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await;

        match result {
            Ok(_) => {
                debug!(kind = ?event.kind, user_id = %event.user_id, "event published");
                Ok(())
            }
            Err(e) => {
                // drop the cached connection so the next publish starts fresh
                self.bus.lock().await.take();
                Err(e.into())
            }
        }
    }

    async fn close(&self) {
        if let Some(bus) = self.bus.lock().await.take() {
            let closing = bus.connection.close(200, "shutdown");
            match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
                Ok(Ok(())) => info!("bus connection closed"),
                Ok(Err(e)) => warn!(error = %e, "error closing bus connection"),
                Err(_) => warn!("timed out closing bus connection"),
            }
        }
    }
}
