//! Durable publisher: declares its exchange, serializes envelopes, and
//! publishes each one on a channel scoped to the call.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use tracing::{debug, warn};

use uq_common::{Envelope, ExchangeKind, ExchangeOptions, MessagingError, Result};

use crate::connection::BrokerConnection;

const DELIVERY_MODE_PERSISTENT: u8 = 2;
const REPLY_SUCCESS: u16 = 200;

/// Seam between domain code and the broker: services and handlers publish
/// through this trait and never touch the transport directly.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: Envelope) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub exchange: ExchangeOptions,
    pub binding_key: String,
    /// Substituted as the message type property when an envelope carries an
    /// empty topic.
    pub default_type_name: String,
    pub mandatory: bool,
    pub immediate: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeOptions::default(),
            binding_key: "userq-routing-key".to_string(),
            default_type_name: "userq".to_string(),
            mandatory: false,
            immediate: false,
        }
    }
}

pub struct AmqpPublisher {
    connection: Arc<BrokerConnection>,
    config: PublisherConfig,
}

impl AmqpPublisher {
    pub fn new(connection: Arc<BrokerConnection>, config: PublisherConfig) -> Self {
        Self { connection, config }
    }

    /// Declare the publisher's exchange. Idempotent; called once at startup
    /// before the first publish.
    pub async fn declare(&self) -> Result<()> {
        let channel = self.connection.create_channel().await?;
        let result = self.declare_on(&channel).await;
        Self::release(channel).await;
        result
    }

    async fn declare_on(&self, channel: &Channel) -> Result<()> {
        let exchange = &self.config.exchange;
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
            })
    }

    async fn publish_on(&self, channel: &Channel, envelope: &Envelope) -> Result<()> {
        let body = envelope.to_bytes()?;

        let type_name = if envelope.topic.is_empty() {
            self.config.default_type_name.clone()
        } else {
            envelope.topic.clone()
        };

        let properties = BasicProperties::default()
            .with_content_type(envelope.content_type.clone().into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_message_id(envelope.id.clone().into())
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_kind(type_name.into());

        debug!(
            exchange = %self.config.exchange.name,
            routing_key = %self.config.binding_key,
            message_id = %envelope.id,
            topic = %envelope.topic,
            "Publishing message"
        );

        channel
            .basic_publish(
                &self.config.exchange.name,
                &self.config.binding_key,
                BasicPublishOptions {
                    mandatory: self.config.mandatory,
                    immediate: self.config.immediate,
                },
                &body,
                properties,
            )
            .await
            .map_err(|e| MessagingError::Publish(e.to_string()))?
            .await
            .map_err(|e| MessagingError::Publish(e.to_string()))?;

        Ok(())
    }

    // The underlying transport channel is not safe for concurrent use, so a
    // fresh one is acquired per publish and released here whether or not the
    // publish succeeded.
    async fn release(channel: Channel) {
        if let Err(e) = channel.close(REPLY_SUCCESS, "publish complete").await {
            warn!(error = %e, "Failed to close publish channel");
        }
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    /// Serialize and publish one envelope with persistent delivery. No
    /// internal retry: the caller decides whether a failed publish is
    /// retried.
    async fn publish(&self, envelope: Envelope) -> Result<()> {
        let channel = self.connection.create_channel().await?;
        let result = self.publish_on(&channel, &envelope).await;
        Self::release(channel).await;
        result
    }
}

fn to_lapin_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
    match kind {
        ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        ExchangeKind::Direct => lapin::ExchangeKind::Direct,
        ExchangeKind::Topic => lapin::ExchangeKind::Topic,
    }
}
