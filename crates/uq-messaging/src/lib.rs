//! Asynchronous messaging core: broker connection lifecycle, publisher,
//! consumer worker pool, and the handler registry that drives the
//! event-dispatch chain.

pub mod connection;
pub mod consumer;
mod dispatch;
pub mod publisher;
pub mod registry;

pub use connection::BrokerConnection;
pub use consumer::{AmqpConsumer, ConsumerConfig};
pub use publisher::{AmqpPublisher, EventPublisher, PublisherConfig};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder, MessageHandler};
