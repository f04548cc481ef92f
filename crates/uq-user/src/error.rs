use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("user not found: {id}")]
    UserNotFound { id: String },

    #[error("verification not found for user {user_id}")]
    VerificationNotFound { user_id: String },

    #[error("invalid verification code: {code}")]
    InvalidCode { code: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("email error: {0}")]
    Email(String),

    #[error("messaging error: {0}")]
    Messaging(#[from] uq_common::MessagingError),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
