pub mod envelope;
pub mod error;
pub mod options;

pub use envelope::{Envelope, ReceivedEnvelope, CONTENT_TYPE_JSON};
pub use error::{MessagingError, Result};
pub use options::{
    BrokerConfig, ConsumerOptions, ExchangeKind, ExchangeOptions, QosOptions, QueueOptions,
};
