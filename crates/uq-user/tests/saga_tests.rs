//! Event-chain tests: each scenario drives a use case or handler against
//! in-memory repositories and recording collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use uq_common::{Envelope, MessagingError};
use uq_messaging::{EventPublisher, MessageHandler};
use uq_user::domain::User;
use uq_user::events::{EmailVerificationSent, EmailVerificationStarted};
use uq_user::handlers::{
    EmailVerificationSentHandler, EmailVerificationStartedHandler, SendEmailVerificationHandler,
    StoreUserImageHandler,
};
use uq_user::ports::{
    BlobStorage, EmailClient, PasswordHasher, StorageItem, UserRepository,
    UserVerificationRepository,
};
use uq_user::repository::{InMemoryUserRepository, InMemoryVerificationRepository};
use uq_user::service::{CreateUserRequest, ImageUpload, UserService, VerificationService};
use uq_user::tasks::{SendEmailVerification, StoreUserImage};
use uq_user::UserError;

struct RecordingPublisher {
    published: Mutex<Vec<Envelope>>,
}

impl RecordingPublisher {
    fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    fn published(&self) -> Vec<Envelope> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, envelope: Envelope) -> uq_common::Result<()> {
        self.published.lock().push(envelope);
        Ok(())
    }
}

struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _envelope: Envelope) -> uq_common::Result<()> {
        Err(MessagingError::Publish("broker unavailable".to_string()))
    }
}

struct RecordingEmailClient {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingEmailClient {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailClient for RecordingEmailClient {
    async fn send(&self, to: &str, body: &[u8]) -> uq_user::Result<()> {
        self.sent
            .lock()
            .push((to.to_string(), String::from_utf8_lossy(body).to_string()));
        Ok(())
    }
}

struct RecordingStorage {
    uploads: Mutex<Vec<StorageItem>>,
    url: String,
}

impl RecordingStorage {
    fn new(url: impl Into<String>) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            url: url.into(),
        }
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }

    fn last_upload(&self) -> StorageItem {
        self.uploads.lock().last().cloned().expect("no uploads recorded")
    }
}

#[async_trait]
impl BlobStorage for RecordingStorage {
    async fn upload(&self, item: StorageItem) -> uq_user::Result<String> {
        self.uploads.lock().push(item);
        Ok(self.url.clone())
    }
}

struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> String {
        format!("hashed:{password}")
    }
}

fn create_request(image: Option<ImageUpload>) -> CreateUserRequest {
    CreateUserRequest {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        password: "hunter2".to_string(),
        job_title: Some("Engineer".to_string()),
        skills: vec!["rust".to_string()],
        image,
    }
}

async fn seed_user(users: &InMemoryUserRepository) -> User {
    users
        .create_user(User::new(
            "Ada",
            "ada@example.com",
            "hashed",
            None,
            Vec::new(),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn create_user_publishes_one_verification_started_event() {
    let users = Arc::new(InMemoryUserRepository::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let service = UserService::new(users, publisher.clone(), Arc::new(PlainHasher), "avatars");

    let user = service.create_user(create_request(None)).await.unwrap();

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, EmailVerificationStarted::TOPIC);

    let event: EmailVerificationStarted =
        serde_json::from_value(published[0].payload.clone()).unwrap();
    assert_eq!(event.email, "ada@example.com");
    assert_eq!(event.user_id, user.uuid);
}

#[tokio::test]
async fn create_user_with_image_also_publishes_store_image_task() {
    let users = Arc::new(InMemoryUserRepository::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let service = UserService::new(users, publisher.clone(), Arc::new(PlainHasher), "avatars");

    let image = ImageUpload {
        content_type: "image/png".to_string(),
        content: "aGVsbG8=".to_string(),
        name: "ada.png".to_string(),
    };
    let user = service.create_user(create_request(Some(image))).await.unwrap();

    let published = publisher.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].topic, StoreUserImage::TOPIC);

    let task: StoreUserImage = serde_json::from_value(published[1].payload.clone()).unwrap();
    assert_eq!(task.user_id, user.uuid);
    assert_eq!(task.bucket, "avatars");
    assert_eq!(task.content, "aGVsbG8=");
}

#[tokio::test]
async fn create_user_surfaces_publish_failures() {
    let users = Arc::new(InMemoryUserRepository::new());
    let service = UserService::new(
        users.clone(),
        Arc::new(FailingPublisher),
        Arc::new(PlainHasher),
        "avatars",
    );

    let err = service.create_user(create_request(None)).await.unwrap_err();
    assert!(matches!(err, UserError::Messaging(_)));
}

#[tokio::test]
async fn verification_started_persists_code_and_publishes_sent_event() {
    let users = Arc::new(InMemoryUserRepository::new());
    let verifications = Arc::new(InMemoryVerificationRepository::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let user = seed_user(&users).await;

    let service = Arc::new(VerificationService::new(users, verifications.clone()));
    let handler = EmailVerificationStartedHandler::new(service, publisher.clone());

    let event = EmailVerificationStarted {
        user_id: user.uuid.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
    };
    handler
        .handle(&serde_json::to_vec(&event).unwrap())
        .await
        .unwrap();

    let persisted = verifications
        .get_verification_by_user(&user.uuid)
        .await
        .unwrap();
    assert!(!persisted.is_verified);

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, EmailVerificationSent::TOPIC);

    let sent: EmailVerificationSent = serde_json::from_value(published[0].payload.clone()).unwrap();
    assert_eq!(sent.code, persisted.code);
    assert_eq!(sent.user_id, user.uuid);
}

#[tokio::test]
async fn verification_started_fails_for_unknown_user() {
    let users = Arc::new(InMemoryUserRepository::new());
    let verifications = Arc::new(InMemoryVerificationRepository::new());
    let publisher = Arc::new(RecordingPublisher::new());

    let service = Arc::new(VerificationService::new(users, verifications));
    let handler = EmailVerificationStartedHandler::new(service, publisher.clone());

    let event = EmailVerificationStarted {
        user_id: "missing".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    };
    let result = handler.handle(&serde_json::to_vec(&event).unwrap()).await;

    assert!(result.is_err());
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn verification_sent_renders_and_sends_the_email() {
    let email = Arc::new(RecordingEmailClient::new());
    let handler = EmailVerificationSentHandler::new(email.clone(), "https://app.example.com");

    let event = EmailVerificationSent {
        user_id: "u-1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        code: "4821".to_string(),
    };
    handler
        .handle(&serde_json::to_vec(&event).unwrap())
        .await
        .unwrap();

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ada@example.com");
    assert!(sent[0].1.contains("4821"));
    assert!(sent[0].1.contains("https://app.example.com/verify-email?code=4821"));
}

#[tokio::test]
async fn send_email_verification_task_requires_an_existing_user() {
    let users = Arc::new(InMemoryUserRepository::new());
    let email = Arc::new(RecordingEmailClient::new());
    let handler =
        SendEmailVerificationHandler::new(users.clone(), email.clone(), "https://app.example.com");

    let task = SendEmailVerification {
        user_id: "missing".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        code: "4821".to_string(),
    };
    assert!(handler
        .handle(&serde_json::to_vec(&task).unwrap())
        .await
        .is_err());
    assert!(email.sent().is_empty());

    let user = seed_user(&users).await;
    let task = SendEmailVerification {
        user_id: user.uuid,
        ..task
    };
    handler
        .handle(&serde_json::to_vec(&task).unwrap())
        .await
        .unwrap();
    assert_eq!(email.sent().len(), 1);
}

#[tokio::test]
async fn store_user_image_uploads_once_and_records_the_url() {
    let users = Arc::new(InMemoryUserRepository::new());
    let storage = Arc::new(RecordingStorage::new("https://blobs.example.com/avatars/ada.png"));
    let user = seed_user(&users).await;

    let handler = StoreUserImageHandler::new(storage.clone(), users.clone());
    let task = StoreUserImage {
        user_id: user.uuid.clone(),
        content_type: "image/png".to_string(),
        content: "aGVsbG8=".to_string(),
        name: "ada.png".to_string(),
        bucket: "avatars".to_string(),
    };
    handler
        .handle(&serde_json::to_vec(&task).unwrap())
        .await
        .unwrap();

    assert_eq!(storage.upload_count(), 1);
    assert_eq!(storage.last_upload().content, "aGVsbG8=");

    let updated = users.get_user_by_uuid(&user.uuid).await.unwrap();
    assert_eq!(
        updated.image_url.as_deref(),
        Some("https://blobs.example.com/avatars/ada.png")
    );
}

#[tokio::test]
async fn verification_lookup_by_code_finds_the_record() {
    let users = Arc::new(InMemoryUserRepository::new());
    let verifications = Arc::new(InMemoryVerificationRepository::new());
    let user = seed_user(&users).await;

    let service = VerificationService::new(users, verifications.clone());
    let verification = service.create_email_verification(&user.uuid).await.unwrap();

    let found = verifications
        .get_verification_by_code(&verification.code)
        .await
        .unwrap();
    assert_eq!(found.user_id, user.uuid);

    assert!(verifications
        .get_verification_by_code("no-such-code")
        .await
        .is_err());
}

#[tokio::test]
async fn verify_email_accepts_the_right_code_and_rejects_the_wrong_one() {
    let users = Arc::new(InMemoryUserRepository::new());
    let verifications = Arc::new(InMemoryVerificationRepository::new());
    let user = seed_user(&users).await;

    let service = VerificationService::new(users, verifications.clone());
    let verification = service.create_email_verification(&user.uuid).await.unwrap();

    // Wrong code: error, no mutation.
    let err = service.verify_email(&user.uuid, "0000").await;
    if verification.code != "0000" {
        assert!(matches!(err, Err(UserError::InvalidCode { .. })));
        let unchanged = verifications
            .get_verification_by_user(&user.uuid)
            .await
            .unwrap();
        assert!(!unchanged.is_verified);
    }

    // Right code: verified.
    service
        .verify_email(&user.uuid, &verification.code)
        .await
        .unwrap();
    let updated = verifications
        .get_verification_by_user(&user.uuid)
        .await
        .unwrap();
    assert!(updated.is_verified);
}
