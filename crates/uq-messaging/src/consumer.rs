//! Consumer: declares exchange/queue/binding, sets channel QoS, and drains
//! one delivery stream with a fixed-size worker pool. Each delivery is
//! handled by exactly one worker; ordering is only guaranteed within a
//! worker.

use std::sync::Arc;

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::Channel;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use uq_common::{
    ConsumerOptions, ExchangeKind, ExchangeOptions, MessagingError, QosOptions, QueueOptions,
    Result,
};

use crate::connection::BrokerConnection;
use crate::dispatch::{dispatch_delivery, DispatchOutcome};
use crate::registry::HandlerRegistry;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub exchange: ExchangeOptions,
    pub queue: QueueOptions,
    pub binding_key: String,
    pub consumer: ConsumerOptions,
    pub qos: QosOptions,
    pub worker_pool_size: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeOptions::default(),
            queue: QueueOptions::default(),
            binding_key: "userq-routing-key".to_string(),
            consumer: ConsumerOptions::default(),
            qos: QosOptions::default(),
            worker_pool_size: 24,
        }
    }
}

pub struct AmqpConsumer {
    connection: Arc<BrokerConnection>,
    config: ConsumerConfig,
    registry: Arc<HandlerRegistry>,
}

impl AmqpConsumer {
    /// The handler table is injected here and treated as read-only for the
    /// consumer's lifetime.
    pub fn new(
        connection: Arc<BrokerConnection>,
        config: ConsumerConfig,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            connection,
            config,
            registry,
        }
    }

    /// Declare exchange, queue, binding and QoS on a fresh channel. All
    /// declarations are idempotent; redeclaring existing topology is safe.
    async fn setup_channel(&self, queue_name: &str) -> Result<Channel> {
        let channel = self.connection.create_channel().await?;
        let exchange = &self.config.exchange;
        let queue = &self.config.queue;

        debug!(exchange = %exchange.name, kind = exchange.kind.as_str(), "Declaring exchange");
        channel
            .exchange_declare(
                &exchange.name,
                to_lapin_kind(exchange.kind),
                ExchangeDeclareOptions {
                    durable: exchange.durable,
                    auto_delete: exchange.auto_delete,
                    internal: exchange.internal,
                    nowait: exchange.no_wait,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::Topology(format!(
                    "failed to declare exchange {}: {}",
                    exchange.name, e
                ))
            })?;

        debug!(queue = %queue_name, "Declaring queue");
        let declared = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: queue.durable,
                    auto_delete: queue.auto_delete,
                    exclusive: queue.exclusive,
                    nowait: queue.no_wait,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::Topology(format!("failed to declare queue {}: {}", queue_name, e))
            })?;

        info!(
            queue = declared.name().as_str(),
            exchange = %exchange.name,
            binding_key = %self.config.binding_key,
            messages = declared.message_count(),
            consumers = declared.consumer_count(),
            "Binding queue to exchange"
        );
        channel
            .queue_bind(
                declared.name().as_str(),
                &exchange.name,
                &self.config.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::Topology(format!(
                    "failed to bind queue {} to exchange {}: {}",
                    queue_name, exchange.name, e
                ))
            })?;

        channel
            .basic_qos(
                self.config.qos.prefetch_count,
                BasicQosOptions {
                    global: self.config.qos.global,
                },
            )
            .await
            .map_err(|e| MessagingError::Topology(format!("failed to set channel qos: {}", e)))?;

        Ok(channel)
    }

    async fn open_stream(&self, channel: &Channel, queue_name: &str) -> Result<lapin::Consumer> {
        let options = &self.config.consumer;
        channel
            .basic_consume(
                queue_name,
                &options.tag,
                BasicConsumeOptions {
                    no_ack: options.auto_ack,
                    exclusive: options.exclusive,
                    no_local: options.no_local,
                    nowait: options.no_wait,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::Consume(e.to_string()))
    }

    /// Start the worker pool and block until shutdown or a fatal stream
    /// error. On shutdown, workers finish their in-flight handler calls
    /// before the pool returns; an unexpected channel close surfaces as an
    /// error so the caller can trigger shutdown.
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let channel = self.setup_channel(&self.config.queue.name).await?;
        let stream = self.open_stream(&channel, &self.config.queue.name).await?;

        info!(
            queue = %self.config.queue.name,
            workers = self.config.worker_pool_size,
            prefetch = self.config.qos.prefetch_count,
            handlers = self.registry.len(),
            "Starting consumer worker pool"
        );

        let stream = Arc::new(Mutex::new(stream));
        let mut workers = JoinSet::new();

        for worker_id in 0..self.config.worker_pool_size {
            let stream = stream.clone();
            let registry = self.registry.clone();
            let shutdown_rx = shutdown.resubscribe();
            workers.spawn(worker_loop(worker_id, stream, registry, shutdown_rx));
        }
        drop(shutdown);

        let mut fatal: Option<MessagingError> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Consumer worker task failed");
                    if fatal.is_none() {
                        fatal = Some(MessagingError::Consume(format!("worker task failed: {e}")));
                    }
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => {
                info!("Consumer worker pool drained");
                Ok(())
            }
        }
    }

    /// Single-shot blocking variant: drain the given queue on one worker
    /// until shutdown or the stream closes. Topology is declared the same
    /// way as for the pool.
    pub async fn consume(&self, queue: &str, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let channel = self.setup_channel(queue).await?;
        let stream = self.open_stream(&channel, queue).await?;

        info!(queue = %queue, "Starting single consumer");
        worker_loop(0, Arc::new(Mutex::new(stream)), self.registry.clone(), shutdown).await
    }
}

async fn worker_loop(
    worker_id: usize,
    stream: Arc<Mutex<lapin::Consumer>>,
    registry: Arc<HandlerRegistry>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    loop {
        // Cancellation happens only here, between deliveries: a handler that
        // is already running is never interrupted mid-call.
        let next = tokio::select! {
            _ = shutdown.recv() => {
                debug!(worker_id, "Worker received shutdown");
                return Ok(());
            }
            next = next_delivery(&stream) => next,
        };

        let delivery = match next {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                error!(worker_id, error = %e, "Delivery stream error");
                return Err(MessagingError::ChannelClosed(e.to_string()));
            }
            None => {
                return Err(MessagingError::ChannelClosed(
                    "delivery stream ended".to_string(),
                ));
            }
        };

        debug!(
            worker_id,
            delivery_tag = delivery.delivery_tag,
            redelivered = delivery.redelivered,
            "Processing delivery"
        );

        settle(worker_id, &delivery, dispatch_delivery(&registry, &delivery.data).await).await;
    }
}

async fn next_delivery(
    stream: &Arc<Mutex<lapin::Consumer>>,
) -> Option<std::result::Result<Delivery, lapin::Error>> {
    stream.lock().await.next().await
}

async fn settle(worker_id: usize, delivery: &Delivery, outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Ack => {
            if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                error!(worker_id, delivery_tag = delivery.delivery_tag, error = %e, "Failed to acknowledge delivery");
            }
        }
        DispatchOutcome::Reject => {
            if let Err(e) = delivery.reject(BasicRejectOptions { requeue: false }).await {
                error!(worker_id, delivery_tag = delivery.delivery_tag, error = %e, "Failed to reject delivery");
            }
        }
    }
}

fn to_lapin_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
    match kind {
        ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        ExchangeKind::Direct => lapin::ExchangeKind::Direct,
        ExchangeKind::Topic => lapin::ExchangeKind::Topic,
    }
}
