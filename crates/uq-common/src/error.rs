#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to connect to broker after {attempts} attempts: {reason}")]
    ConnectExhausted { attempts: u32, reason: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("topology declaration error: {0}")]
    Topology(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("consume error: {0}")]
    Consume(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate handler registered for topic {0}")]
    DuplicateHandler(String),

    #[error("no handler registered for topic {0}")]
    MissingHandler(String),

    #[error("delivery channel closed unexpectedly: {0}")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, MessagingError>;
