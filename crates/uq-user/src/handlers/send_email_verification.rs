use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use uq_messaging::MessageHandler;

use crate::ports::{EmailClient, UserRepository};
use crate::tasks::SendEmailVerification;
use crate::templates;

/// Task-queue variant of the send step: the code arrives in the task
/// itself. The user is looked up so a resend for a deleted user fails
/// instead of mailing a stranger.
pub struct SendEmailVerificationHandler {
    users: Arc<dyn UserRepository>,
    email: Arc<dyn EmailClient>,
    frontend_url: String,
}

impl SendEmailVerificationHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        email: Arc<dyn EmailClient>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            email,
            frontend_url: frontend_url.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for SendEmailVerificationHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()> {
        let task: SendEmailVerification = serde_json::from_slice(payload)?;
        info!(user_id = %task.user_id, email = %task.email, "Handling send email verification task");

        self.users.get_user_by_uuid(&task.user_id).await?;

        let body =
            templates::verification_email(&task.email, &task.name, &task.code, &self.frontend_url);
        self.email.send(&task.email, &body).await?;

        Ok(())
    }
}
