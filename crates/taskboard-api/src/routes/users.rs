//! User profile routes

use axum::{Json, Router, routing::get};

use crate::extract::CurrentUser;
use crate::state::AppState;

use super::types::UserResponse;

/// GET /users/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me))
}
