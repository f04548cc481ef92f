//! Domain events carried as envelope payloads. Each type declares its
//! canonical topic, which is also the handler-registry key.

use serde::{Deserialize, Serialize};

use uq_common::Envelope;

/// Published by the create-user use case once the user row is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerificationStarted {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl EmailVerificationStarted {
    pub const TOPIC: &'static str = "EmailVerificationStarted";

    pub fn envelope(&self) -> uq_common::Result<Envelope> {
        Envelope::json(Self::TOPIC, self)
    }
}

/// Published by the verification-started handler once a code is persisted;
/// its handler sends the actual email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerificationSent {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub code: String,
}

impl EmailVerificationSent {
    pub const TOPIC: &'static str = "EmailVerificationSent";

    pub fn envelope(&self) -> uq_common::Result<Envelope> {
        Envelope::json(Self::TOPIC, self)
    }
}
