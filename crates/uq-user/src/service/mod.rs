pub mod users;
pub mod verification;

pub use users::{CreateUserRequest, ImageUpload, UserService};
pub use verification::VerificationService;
