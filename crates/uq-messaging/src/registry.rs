//! Handler registry: an explicit, immutable topic-to-handler table built at
//! construction time and injected into the consumer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use uq_common::{MessagingError, Result};

/// A typed reaction to one event/task topic. Handlers run concurrently
/// across consumer workers and must be safe to invoke from several tasks at
/// once.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle the raw payload of a delivery routed to this handler's topic.
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()>;
}

/// Immutable topic-to-handler table. Built once at startup; no runtime
/// re-registration.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    pub fn get(&self, topic: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Startup check: every topic the application publishes must have a
    /// registered handler, otherwise deliveries would fail unroutable at
    /// runtime.
    pub fn verify_topics(&self, expected: &[&str]) -> Result<()> {
        for topic in expected {
            if !self.handlers.contains_key(*topic) {
                return Err(MessagingError::MissingHandler(topic.to_string()));
            }
        }
        Ok(())
    }
}

pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistryBuilder {
    /// Register a handler for a topic. Registering the same topic twice is
    /// an error, which also catches drifting type-name constants.
    pub fn register(
        mut self,
        topic: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self> {
        let topic = topic.into();
        if self.handlers.contains_key(&topic) {
            return Err(MessagingError::DuplicateHandler(topic));
        }
        self.handlers.insert(topic, handler);
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl MessageHandler for NoopHandler {
        async fn handle(&self, _payload: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_topic_registration_is_rejected() {
        let result = HandlerRegistry::builder()
            .register("EmailVerificationStarted", Arc::new(NoopHandler))
            .unwrap()
            .register("EmailVerificationStarted", Arc::new(NoopHandler));

        assert!(matches!(result, Err(MessagingError::DuplicateHandler(topic)) if topic == "EmailVerificationStarted"));
    }

    #[test]
    fn verify_topics_flags_missing_handlers_at_startup() {
        let registry = HandlerRegistry::builder()
            .register("EmailVerificationStarted", Arc::new(NoopHandler))
            .unwrap()
            .build();

        assert!(registry.verify_topics(&["EmailVerificationStarted"]).is_ok());

        let err = registry
            .verify_topics(&["EmailVerificationStarted", "StoreUserImage"])
            .unwrap_err();
        assert!(matches!(err, MessagingError::MissingHandler(topic) if topic == "StoreUserImage"));
    }
}
