use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One email-verification attempt for a user. Created by the verification
/// handler chain with `is_verified = false`; mutated only by the verify-email
/// use case; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVerification {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserVerification {
    pub fn new(user_id: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            code: code.into(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Generate a 4-digit numeric verification code, zero-padded.
pub fn generate_code() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_four_numeric_digits() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "bad code: {code}");
        }
    }

    #[test]
    fn new_verification_starts_unverified() {
        let verification = UserVerification::new("user-1", "4821");
        assert_eq!(verification.user_id, "user-1");
        assert_eq!(verification.code, "4821");
        assert!(!verification.is_verified);
    }
}
