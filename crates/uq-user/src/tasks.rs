//! Task messages: direct units of background work, as opposed to the event
//! chain in `events`.

use serde::{Deserialize, Serialize};

use uq_common::Envelope;

use crate::events::{EmailVerificationSent, EmailVerificationStarted};

/// Direct-send variant carrying its own code; used to resend a known code
/// outside the event chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailVerification {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub code: String,
}

impl SendEmailVerification {
    pub const TOPIC: &'static str = "SendEmailVerification";

    pub fn envelope(&self) -> uq_common::Result<Envelope> {
        Envelope::json(Self::TOPIC, self)
    }
}

/// Upload a user's profile image to blob storage and record the resulting
/// URL on the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUserImage {
    pub user_id: String,
    pub content_type: String,
    /// Base64-encoded image bytes, passed through to the blob store.
    pub content: String,
    pub name: String,
    pub bucket: String,
}

impl StoreUserImage {
    pub const TOPIC: &'static str = "StoreUserImage";

    pub fn envelope(&self) -> uq_common::Result<Envelope> {
        Envelope::json(Self::TOPIC, self)
    }
}

/// Every topic this application publishes. The handler registry is verified
/// against this list at startup so an unroutable topic fails fast instead of
/// at consume time.
pub fn published_topics() -> [&'static str; 4] {
    [
        EmailVerificationStarted::TOPIC,
        EmailVerificationSent::TOPIC,
        SendEmailVerification::TOPIC,
        StoreUserImage::TOPIC,
    ]
}
