pub mod password;
pub mod redact;
pub mod validation;

pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use redact::TokenPrefix;
pub use validation::ValidatedJson;
