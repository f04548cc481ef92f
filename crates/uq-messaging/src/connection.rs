//! Broker connection lifecycle: one long-lived connection per process,
//! established with bounded retry/backoff and shared by publisher and
//! consumer.

use lapin::{Channel, Connection, ConnectionProperties};
use tracing::{info, warn};

use uq_common::{BrokerConfig, MessagingError, Result};

/// Owns the single AMQP connection for the process. Created once at startup,
/// closed at shutdown.
pub struct BrokerConnection {
    inner: Connection,
}

impl BrokerConnection {
    /// Dial the broker, retrying with a fixed backoff. After
    /// `connect_retries` failed attempts the error is fatal and startup
    /// should abort.
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let uri = config.amqp_uri();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match Connection::connect(&uri, ConnectionProperties::default()).await {
                Ok(connection) => {
                    info!(
                        host = %config.host,
                        port = config.port,
                        attempts = attempts,
                        "Connected to AMQP broker"
                    );
                    return Ok(Self { inner: connection });
                }
                Err(e) if attempts < config.connect_retries => {
                    warn!(
                        attempt = attempts,
                        max_attempts = config.connect_retries,
                        backoff_seconds = config.connect_backoff_seconds,
                        error = %e,
                        "Broker dial failed, backing off"
                    );
                    tokio::time::sleep(config.connect_backoff()).await;
                }
                Err(e) => {
                    return Err(MessagingError::ConnectExhausted {
                        attempts,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Open a protocol channel on the shared connection.
    pub async fn create_channel(&self) -> Result<Channel> {
        self.inner
            .create_channel()
            .await
            .map_err(|e| MessagingError::Channel(e.to_string()))
    }

    pub fn is_connected(&self) -> bool {
        self.inner.status().connected()
    }

    /// Close the connection. Safe to call during shutdown and idempotent:
    /// closing an already-closed connection is a no-op.
    pub async fn close(&self) -> Result<()> {
        if !self.inner.status().connected() {
            return Ok(());
        }
        info!("Closing AMQP broker connection");
        self.inner
            .close(200, "shutdown")
            .await
            .map_err(|e| MessagingError::Channel(e.to_string()))
    }
}
