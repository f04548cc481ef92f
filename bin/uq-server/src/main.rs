//! UserQ Server
//!
//! Connects to the AMQP broker, starts the consumer worker pool that drives
//! the user verification and image-store chains, and serves the thin user
//! API plus health endpoints.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RABBITMQ_HOST` | `localhost` | Broker host |
//! | `RABBITMQ_PORT` | `5672` | Broker port |
//! | `RABBITMQ_USERNAME` | `guest` | Broker username |
//! | `RABBITMQ_PASSWORD` | `guest` | Broker password |
//! | `UQ_CONNECT_RETRIES` | `5` | Max broker dial attempts before aborting |
//! | `UQ_CONNECT_BACKOFF_SECONDS` | `2` | Fixed backoff between dial attempts |
//! | `UQ_EXCHANGE_NAME` | `userq-exchange` | Exchange name |
//! | `UQ_EXCHANGE_KIND` | `direct` | Exchange kind: `fanout`, `direct`, `topic` |
//! | `UQ_EXCHANGE_DURABLE` | `true` | Declare the exchange durable |
//! | `UQ_QUEUE_NAME` | `userq-queue` | Queue name |
//! | `UQ_QUEUE_DURABLE` | `true` | Declare the queue durable |
//! | `UQ_BINDING_KEY` | `userq-routing-key` | Binding/routing key |
//! | `UQ_CONSUMER_TAG` | `userq-consumer` | Consumer tag |
//! | `UQ_PREFETCH_COUNT` | `1` | Channel QoS prefetch count |
//! | `UQ_WORKER_POOL_SIZE` | `24` | Consumer worker tasks |
//! | `UQ_HTTP_PORT` | `8080` | API/health port |
//! | `UQ_FRONTEND_URL` | `http://localhost:3000` | Base URL for email deep links |
//! | `UQ_IMAGE_BUCKET` | `userq-images` | Bucket for profile images |
//! | `UQ_MONGO_URL` | - | MongoDB URL; in-memory repositories when unset |
//! | `UQ_MONGO_DB` | `userq` | MongoDB database name |
//! | `RUST_LOG` | `info` | Log level |

mod api;
mod collaborators;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uq_common::{BrokerConfig, ExchangeKind, ExchangeOptions, QosOptions, QueueOptions};
use uq_messaging::{
    AmqpConsumer, AmqpPublisher, BrokerConnection, ConsumerConfig, EventPublisher,
    HandlerRegistry, PublisherConfig,
};
use uq_user::handlers::{
    EmailVerificationSentHandler, EmailVerificationStartedHandler, SendEmailVerificationHandler,
    StoreUserImageHandler,
};
use uq_user::ports::{UserRepository, UserVerificationRepository};
use uq_user::repository::{
    InMemoryUserRepository, InMemoryVerificationRepository, MongoUserRepository,
    MongoVerificationRepository,
};
use uq_user::service::{UserService, VerificationService};
use uq_user::tasks::published_topics;

use collaborators::{DevBlobStorage, LogEmailClient, Sha256PasswordHasher};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting UserQ Server");

    // Configuration
    let broker_config = BrokerConfig {
        host: env_or("RABBITMQ_HOST", "localhost"),
        port: env_or_parse("RABBITMQ_PORT", 5672),
        username: env_or("RABBITMQ_USERNAME", "guest"),
        password: env_or("RABBITMQ_PASSWORD", "guest"),
        connect_retries: env_or_parse("UQ_CONNECT_RETRIES", 5),
        connect_backoff_seconds: env_or_parse("UQ_CONNECT_BACKOFF_SECONDS", 2),
    };

    let exchange = ExchangeOptions {
        name: env_or("UQ_EXCHANGE_NAME", "userq-exchange"),
        kind: env_or("UQ_EXCHANGE_KIND", "direct")
            .parse::<ExchangeKind>()
            .map_err(|e| anyhow::anyhow!(e))?,
        durable: env_or_parse("UQ_EXCHANGE_DURABLE", true),
        ..Default::default()
    };
    let queue = QueueOptions {
        name: env_or("UQ_QUEUE_NAME", "userq-queue"),
        durable: env_or_parse("UQ_QUEUE_DURABLE", true),
        ..Default::default()
    };
    let binding_key = env_or("UQ_BINDING_KEY", "userq-routing-key");

    let http_port: u16 = env_or_parse("UQ_HTTP_PORT", 8080);
    let frontend_url = env_or("UQ_FRONTEND_URL", "http://localhost:3000");
    let image_bucket = env_or("UQ_IMAGE_BUCKET", "userq-images");

    // Broker connection: bounded retry, fatal on exhaustion
    let connection = Arc::new(BrokerConnection::connect(&broker_config).await?);

    // Publisher
    let publisher = Arc::new(AmqpPublisher::new(
        connection.clone(),
        PublisherConfig {
            exchange: exchange.clone(),
            binding_key: binding_key.clone(),
            ..Default::default()
        },
    ));
    publisher.declare().await?;
    info!(exchange = %exchange.name, "Publisher initialized");

    // Repositories
    let (users, verifications) = create_repositories().await?;

    // Services and handlers
    let verification_service = Arc::new(VerificationService::new(
        users.clone(),
        verifications.clone(),
    ));
    let user_service = Arc::new(UserService::new(
        users.clone(),
        publisher.clone() as Arc<dyn EventPublisher>,
        Arc::new(Sha256PasswordHasher),
        image_bucket,
    ));
    let email_client = Arc::new(LogEmailClient);
    let blob_storage = Arc::new(DevBlobStorage);

    let registry = HandlerRegistry::builder()
        .register(
            uq_user::events::EmailVerificationStarted::TOPIC,
            Arc::new(EmailVerificationStartedHandler::new(
                verification_service.clone(),
                publisher.clone(),
            )),
        )?
        .register(
            uq_user::events::EmailVerificationSent::TOPIC,
            Arc::new(EmailVerificationSentHandler::new(
                email_client.clone(),
                frontend_url.clone(),
            )),
        )?
        .register(
            uq_user::tasks::SendEmailVerification::TOPIC,
            Arc::new(SendEmailVerificationHandler::new(
                users.clone(),
                email_client,
                frontend_url,
            )),
        )?
        .register(
            uq_user::tasks::StoreUserImage::TOPIC,
            Arc::new(StoreUserImageHandler::new(blob_storage, users.clone())),
        )?
        .build();

    // Every published topic must be routable before the consumer starts.
    registry.verify_topics(&published_topics())?;

    let consumer = AmqpConsumer::new(
        connection.clone(),
        ConsumerConfig {
            exchange,
            queue,
            binding_key,
            consumer: uq_common::ConsumerOptions {
                tag: env_or("UQ_CONSUMER_TAG", "userq-consumer"),
                ..Default::default()
            },
            qos: QosOptions {
                prefetch_count: env_or_parse("UQ_PREFETCH_COUNT", 1),
                ..Default::default()
            },
            worker_pool_size: env_or_parse("UQ_WORKER_POOL_SIZE", 24),
        },
        Arc::new(registry),
    );

    // Setup shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start consumer; a fatal consumer error (unexpected channel close)
    // triggers process shutdown.
    let consumer_handle = {
        let shutdown_tx = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = consumer.run(shutdown_rx).await {
                error!(error = %e, "Consumer terminated with fatal error");
                let _ = shutdown_tx.send(());
            }
        })
    };

    // Start API server
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    info!("API listening on http://{}", addr);

    let app = api::create_router(api::AppState {
        users: user_service,
        verifications: verification_service,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let api_handle = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        })
    };

    info!("UserQ Server started");
    info!("Press Ctrl+C to shutdown");

    // Wait for a signal or an internally triggered shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received...");
        }
        _ = shutdown_rx.recv() => {
            info!("Internal shutdown triggered...");
        }
    }

    let _ = shutdown_tx.send(());

    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        let _ = consumer_handle.await;
        let _ = api_handle.await;
    })
    .await;

    if let Err(e) = connection.close().await {
        error!(error = %e, "Failed to close broker connection");
    }

    info!("UserQ Server shutdown complete");
    Ok(())
}

async fn create_repositories() -> Result<(
    Arc<dyn UserRepository>,
    Arc<dyn UserVerificationRepository>,
)> {
    match std::env::var("UQ_MONGO_URL") {
        Ok(url) => {
            let db_name = env_or("UQ_MONGO_DB", "userq");
            let client = mongodb::Client::with_uri_str(&url).await?;
            info!(db = %db_name, "Using MongoDB repositories");
            Ok((
                Arc::new(MongoUserRepository::new(&client, &db_name, "users")),
                Arc::new(MongoVerificationRepository::new(
                    &client,
                    &db_name,
                    "user_verifications",
                )),
            ))
        }
        Err(_) => {
            info!("UQ_MONGO_URL not set, using in-memory repositories");
            Ok((
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryVerificationRepository::new()),
            ))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
