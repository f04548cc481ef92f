use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use uq_messaging::MessageHandler;

use crate::ports::{BlobStorage, StorageItem, UserRepository};
use crate::tasks::StoreUserImage;

/// Image branch of the chain: upload the bytes, then record the URL on the
/// user. The two steps are not transactional; if the record update fails the
/// uploaded object stays in the bucket.
pub struct StoreUserImageHandler {
    storage: Arc<dyn BlobStorage>,
    users: Arc<dyn UserRepository>,
}

impl StoreUserImageHandler {
    pub fn new(storage: Arc<dyn BlobStorage>, users: Arc<dyn UserRepository>) -> Self {
        Self { storage, users }
    }
}

#[async_trait]
impl MessageHandler for StoreUserImageHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()> {
        let task: StoreUserImage = serde_json::from_slice(payload)?;
        info!(user_id = %task.user_id, bucket = %task.bucket, "Handling store user image task");

        let url = self
            .storage
            .upload(StorageItem {
                content_type: task.content_type,
                content: task.content,
                name: task.name,
                bucket: task.bucket,
            })
            .await?;

        let mut user = match self.users.get_user_by_uuid(&task.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %task.user_id, url = %url, "Image uploaded but user lookup failed");
                return Err(e.into());
            }
        };

        user.image_url = Some(url);
        user.updated_at = Utc::now();
        if let Err(e) = self.users.update_user(user).await {
            warn!(user_id = %task.user_id, "Image uploaded but user record update failed");
            return Err(e.into());
        }

        Ok(())
    }
}
