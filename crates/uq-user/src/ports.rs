//! Outbound collaborator ports. The core calls these from use cases and
//! handlers; implementations live at the edges (repository adapters, blob
//! store, SMTP).

use async_trait::async_trait;

use crate::domain::{User, UserVerification};
use crate::Result;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User>;
    async fn get_user_by_uuid(&self, uuid: &str) -> Result<User>;
    async fn update_user(&self, user: User) -> Result<User>;
}

#[async_trait]
pub trait UserVerificationRepository: Send + Sync {
    async fn create_verification(&self, verification: UserVerification) -> Result<UserVerification>;
    async fn get_verification_by_user(&self, user_id: &str) -> Result<UserVerification>;
    async fn get_verification_by_code(&self, code: &str) -> Result<UserVerification>;
    async fn update_verification(&self, user_id: &str, is_verified: bool) -> Result<()>;
}

/// An item to upload to the blob store.
#[derive(Debug, Clone)]
pub struct StorageItem {
    pub content_type: String,
    pub content: String,
    pub name: String,
    pub bucket: String,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload the item and return its public URL.
    async fn upload(&self, item: StorageItem) -> Result<String>;
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, to: &str, body: &[u8]) -> Result<()>;
}

/// Hashing is a collaborator concern; the algorithm is chosen by the
/// implementation wired at the edge.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
}
