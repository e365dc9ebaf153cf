//! Authentication module for Omnicanal

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{extract_token, require_auth, AuthAgent};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
