//! In-memory repository adapters, used by tests and by dev mode when no
//! database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{User, UserVerification};
use crate::ports::{UserRepository, UserVerificationRepository};
use crate::{Result, UserError};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: User) -> Result<User> {
        self.users.write().insert(user.uuid.clone(), user.clone());
        Ok(user)
    }

    async fn get_user_by_uuid(&self, uuid: &str) -> Result<User> {
        self.users
            .read()
            .get(uuid)
            .cloned()
            .ok_or_else(|| UserError::UserNotFound {
                id: uuid.to_string(),
            })
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write();
        if !users.contains_key(&user.uuid) {
            return Err(UserError::UserNotFound {
                id: user.uuid.clone(),
            });
        }
        users.insert(user.uuid.clone(), user.clone());
        Ok(user)
    }
}

/// Keyed by user id: the observed flow creates at most one active
/// verification per user.
#[derive(Default)]
pub struct InMemoryVerificationRepository {
    verifications: RwLock<HashMap<String, UserVerification>>,
}

impl InMemoryVerificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserVerificationRepository for InMemoryVerificationRepository {
    async fn create_verification(&self, verification: UserVerification) -> Result<UserVerification> {
        self.verifications
            .write()
            .insert(verification.user_id.clone(), verification.clone());
        Ok(verification)
    }

    async fn get_verification_by_user(&self, user_id: &str) -> Result<UserVerification> {
        self.verifications
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| UserError::VerificationNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn get_verification_by_code(&self, code: &str) -> Result<UserVerification> {
        self.verifications
            .read()
            .values()
            .find(|v| v.code == code)
            .cloned()
            .ok_or_else(|| UserError::VerificationNotFound {
                user_id: format!("code={code}"),
            })
    }

    async fn update_verification(&self, user_id: &str, is_verified: bool) -> Result<()> {
        let mut verifications = self.verifications.write();
        match verifications.get_mut(user_id) {
            Some(verification) => {
                verification.is_verified = is_verified;
                verification.updated_at = Utc::now();
                Ok(())
            }
            None => Err(UserError::VerificationNotFound {
                user_id: user_id.to_string(),
            }),
        }
    }
}
