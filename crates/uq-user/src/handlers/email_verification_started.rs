use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use uq_messaging::{EventPublisher, MessageHandler};

use crate::events::{EmailVerificationSent, EmailVerificationStarted};
use crate::service::VerificationService;

/// First link of the verification chain: persist a code for the new user and
/// hand off to the send step.
pub struct EmailVerificationStartedHandler {
    verifications: Arc<VerificationService>,
    publisher: Arc<dyn EventPublisher>,
}

impl EmailVerificationStartedHandler {
    pub fn new(verifications: Arc<VerificationService>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            verifications,
            publisher,
        }
    }
}

#[async_trait]
impl MessageHandler for EmailVerificationStartedHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()> {
        let event: EmailVerificationStarted = serde_json::from_slice(payload)?;
        info!(user_id = %event.user_id, email = %event.email, "Handling email verification started");

        let verification = self
            .verifications
            .create_email_verification(&event.user_id)
            .await?;

        let sent = EmailVerificationSent {
            user_id: event.user_id,
            email: event.email,
            name: event.name,
            code: verification.code,
        };
        self.publisher.publish(sent.envelope()?).await?;

        Ok(())
    }
}
