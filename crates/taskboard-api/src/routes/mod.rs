//! API routes

mod auth;
mod health;
mod tasks;
pub mod types;
mod users;

use axum::Router;

use crate::state::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(users::routes())
        .merge(tasks::routes())
        .with_state(state)
}
