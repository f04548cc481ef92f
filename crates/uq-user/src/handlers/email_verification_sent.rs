use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use uq_messaging::MessageHandler;

use crate::events::EmailVerificationSent;
use crate::ports::EmailClient;
use crate::templates;

/// Second link of the verification chain: render the template with the
/// persisted code and send it through the email collaborator.
pub struct EmailVerificationSentHandler {
    email: Arc<dyn EmailClient>,
    frontend_url: String,
}

impl EmailVerificationSentHandler {
    pub fn new(email: Arc<dyn EmailClient>, frontend_url: impl Into<String>) -> Self {
        Self {
            email,
            frontend_url: frontend_url.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for EmailVerificationSentHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()> {
        let event: EmailVerificationSent = serde_json::from_slice(payload)?;
        info!(user_id = %event.user_id, email = %event.email, "Sending verification email");

        let body = templates::verification_email(
            &event.email,
            &event.name,
            &event.code,
            &self.frontend_url,
        );
        self.email.send(&event.email, &body).await?;

        Ok(())
    }
}
