//! Token issuing, password hashing and the authenticated-user extractor.

mod extractor;
mod jwt;
pub mod password;
pub use password::PasswordError;

pub use extractor::AuthUser;
pub use jwt::{decode, encode, issue_pair, AuthError, Claims, TokenPair, TokenType};
