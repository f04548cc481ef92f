//! Thin MongoDB repository adapters. Deliberately limited to the basic CRUD
//! the use cases call; anything richer belongs to the collaborator, not
//! here.

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::domain::{User, UserVerification};
use crate::ports::{UserRepository, UserVerificationRepository};
use crate::{Result, UserError};

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    uuid: String,
    name: String,
    email: String,
    password_hash: String,
    job_title: Option<String>,
    skills: Vec<String>,
    image_url: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            job_title: user.job_title,
            skills: user.skills,
            image_url: user.image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            uuid: doc.uuid,
            name: doc.name,
            email: doc.email,
            password_hash: doc.password_hash,
            job_title: doc.job_title,
            skills: doc.skills,
            image_url: doc.image_url,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(client: &Client, db_name: &str, collection_name: &str) -> Self {
        let collection = client.database(db_name).collection(collection_name);
        Self { collection }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create_user(&self, user: User) -> Result<User> {
        self.collection
            .insert_one(UserDocument::from(user.clone()))
            .await?;
        Ok(user)
    }

    async fn get_user_by_uuid(&self, uuid: &str) -> Result<User> {
        let found = self.collection.find_one(doc! { "uuid": uuid }).await?;
        found.map(User::from).ok_or_else(|| UserError::UserNotFound {
            id: uuid.to_string(),
        })
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let result = self
            .collection
            .replace_one(
                doc! { "uuid": &user.uuid },
                UserDocument::from(user.clone()),
            )
            .await?;
        if result.matched_count == 0 {
            return Err(UserError::UserNotFound {
                id: user.uuid.clone(),
            });
        }
        Ok(user)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VerificationDocument {
    id: String,
    user_id: String,
    code: String,
    is_verified: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<UserVerification> for VerificationDocument {
    fn from(v: UserVerification) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            code: v.code,
            is_verified: v.is_verified,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

impl From<VerificationDocument> for UserVerification {
    fn from(doc: VerificationDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            code: doc.code,
            is_verified: doc.is_verified,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub struct MongoVerificationRepository {
    collection: Collection<VerificationDocument>,
}

impl MongoVerificationRepository {
    pub fn new(client: &Client, db_name: &str, collection_name: &str) -> Self {
        let collection = client.database(db_name).collection(collection_name);
        Self { collection }
    }
}

#[async_trait]
impl UserVerificationRepository for MongoVerificationRepository {
    async fn create_verification(&self, verification: UserVerification) -> Result<UserVerification> {
        self.collection
            .insert_one(VerificationDocument::from(verification.clone()))
            .await?;
        Ok(verification)
    }

    async fn get_verification_by_user(&self, user_id: &str) -> Result<UserVerification> {
        let found = self.collection.find_one(doc! { "user_id": user_id }).await?;
        found
            .map(UserVerification::from)
            .ok_or_else(|| UserError::VerificationNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn get_verification_by_code(&self, code: &str) -> Result<UserVerification> {
        let found = self.collection.find_one(doc! { "code": code }).await?;
        found
            .map(UserVerification::from)
            .ok_or_else(|| UserError::VerificationNotFound {
                user_id: format!("code={code}"),
            })
    }

    async fn update_verification(&self, user_id: &str, is_verified: bool) -> Result<()> {
        let result = self
            .collection
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": {
                    "is_verified": is_verified,
                    "updated_at": bson::DateTime::from_chrono(Utc::now()),
                }},
            )
            .await?;
        if result.matched_count == 0 {
            return Err(UserError::VerificationNotFound {
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }
}
