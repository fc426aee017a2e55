//! Credential handling: password hashing and session tokens.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenIssuer};
pub use password::PasswordHasher;
