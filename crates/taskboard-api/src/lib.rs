//! Taskboard REST API
//!
//! This crate provides the Axum-based HTTP API for Taskboard:
//! registration and login, the bearer-token access guard, and
//! owner-scoped task endpoints.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use extract::CurrentUser;
pub use routes::create_router;
pub use state::AppState;
