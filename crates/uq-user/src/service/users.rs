//! Create-user use case: the synchronous entry point of the asynchronous
//! chain. Persists the user, then publishes the follow-up work.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use uq_messaging::EventPublisher;

use crate::domain::User;
use crate::events::EmailVerificationStarted;
use crate::ports::{PasswordHasher, UserRepository};
use crate::tasks::StoreUserImage;
use crate::Result;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    /// Base64-encoded image bytes.
    pub content: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub job_title: Option<String>,
    pub skills: Vec<String>,
    pub image: Option<ImageUpload>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    publisher: Arc<dyn EventPublisher>,
    hasher: Arc<dyn PasswordHasher>,
    image_bucket: String,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        publisher: Arc<dyn EventPublisher>,
        hasher: Arc<dyn PasswordHasher>,
        image_bucket: impl Into<String>,
    ) -> Self {
        Self {
            users,
            publisher,
            hasher,
            image_bucket: image_bucket.into(),
        }
    }

    /// Persist the user, then publish the verification event and, when image
    /// data is attached, the image-store task. Publishes are awaited: a
    /// failed publish surfaces to the caller instead of being fired and
    /// forgotten, so the caller can decide how to report the partial
    /// success.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let password_hash = self.hasher.hash(&request.password);
        let user = User::new(
            request.name,
            request.email,
            password_hash,
            request.job_title,
            request.skills,
        );

        let user = self.users.create_user(user).await?;
        info!(user_id = %user.uuid, email = %user.email, "User created, publishing follow-up work");

        let started = EmailVerificationStarted {
            user_id: user.uuid.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        self.publisher.publish(started.envelope()?).await?;

        if let Some(image) = request.image {
            let task = StoreUserImage {
                user_id: user.uuid.clone(),
                content_type: image.content_type,
                content: image.content,
                name: image.name,
                bucket: self.image_bucket.clone(),
            };
            self.publisher.publish(task.envelope()?).await?;
        }

        Ok(user)
    }

    pub async fn get_user(&self, uuid: &str) -> Result<User> {
        self.users.get_user_by_uuid(uuid).await
    }

    pub async fn update_user(&self, mut user: User) -> Result<User> {
        user.updated_at = Utc::now();
        self.users.update_user(user).await
    }
}
