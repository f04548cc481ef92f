//! Edge implementations of the collaborator ports. The real SMTP and blob
//! clients are deployment concerns; these keep the server runnable in dev.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::info;

use uq_user::ports::{BlobStorage, EmailClient, PasswordHasher, StorageItem};

pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Logs outgoing mail instead of delivering it.
pub struct LogEmailClient;

#[async_trait]
impl EmailClient for LogEmailClient {
    async fn send(&self, to: &str, body: &[u8]) -> uq_user::Result<()> {
        info!(to = %to, bytes = body.len(), "Email send (dev mode, not delivered)");
        Ok(())
    }
}

/// Accepts uploads and returns a deterministic URL without persisting
/// anything.
pub struct DevBlobStorage;

#[async_trait]
impl BlobStorage for DevBlobStorage {
    async fn upload(&self, item: StorageItem) -> uq_user::Result<String> {
        info!(bucket = %item.bucket, name = %item.name, "Blob upload (dev mode, not persisted)");
        Ok(format!("https://{}.storage.local/{}", item.bucket, item.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_stable_hex() {
        let hasher = Sha256PasswordHasher;
        let a = hasher.hash("hunter2");
        let b = hasher.hash("hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
