//! Email-verification use cases: code creation (driven by the event chain)
//! and the synchronous verify-email call.

use std::sync::Arc;

use tracing::info;

use crate::domain::{generate_code, UserVerification};
use crate::ports::{UserRepository, UserVerificationRepository};
use crate::{Result, UserError};

pub struct VerificationService {
    users: Arc<dyn UserRepository>,
    verifications: Arc<dyn UserVerificationRepository>,
}

impl VerificationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        verifications: Arc<dyn UserVerificationRepository>,
    ) -> Self {
        Self {
            users,
            verifications,
        }
    }

    /// Generate a fresh 4-digit code and persist an unverified record for
    /// the user. The user must exist.
    pub async fn create_email_verification(&self, user_id: &str) -> Result<UserVerification> {
        self.users.get_user_by_uuid(user_id).await?;

        let verification = UserVerification::new(user_id, generate_code());
        let verification = self.verifications.create_verification(verification).await?;
        info!(user_id = %user_id, verification_id = %verification.id, "Created email verification");
        Ok(verification)
    }

    /// Compare the submitted code against the persisted one. A mismatch is
    /// an error and leaves the record untouched.
    pub async fn verify_email(&self, user_id: &str, code: &str) -> Result<()> {
        self.users.get_user_by_uuid(user_id).await?;

        let verification = self.verifications.get_verification_by_user(user_id).await?;
        if verification.code != code {
            return Err(UserError::InvalidCode {
                code: code.to_string(),
            });
        }

        self.verifications.update_verification(user_id, true).await?;
        info!(user_id = %user_id, "Email verified");
        Ok(())
    }
}
