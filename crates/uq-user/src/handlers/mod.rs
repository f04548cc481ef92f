//! The event chain. Each handler is one link of the saga: it reacts to a
//! single topic and may publish the next message. There is no cross-step
//! transaction; a failure leaves earlier steps applied.

mod email_verification_sent;
mod email_verification_started;
mod send_email_verification;
mod store_user_image;

pub use email_verification_sent::EmailVerificationSentHandler;
pub use email_verification_started::EmailVerificationStartedHandler;
pub use send_email_verification::SendEmailVerificationHandler;
pub use store_user_image::StoreUserImageHandler;
