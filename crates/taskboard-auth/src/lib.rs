//! Taskboard Authentication
//!
//! This crate provides JWT-based session tokens and password hashing
//! for the Taskboard API.

pub mod bearer;
pub mod error;
pub mod jwt;
pub mod password;

pub use bearer::extract_bearer_token;
pub use error::AuthError;
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password, DUMMY_PASSWORD_HASH};
