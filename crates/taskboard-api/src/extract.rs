//! Authentication extractors
//!
//! `CurrentUser` is the access guard: every protected handler takes it as an
//! argument, so a request only reaches resource logic with a resolved,
//! active user attached.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use taskboard_auth::{AuthError, extract_bearer_token};
use taskboard_db::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for the authenticated user (required)
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Auth(AuthError::MissingAuthHeader))?;

        let token = extract_bearer_token(auth_header)?;
        let claims = app_state.jwt.validate_token(token)?;

        // A tampered subject must never resolve to a different identity
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Auth(AuthError::InvalidToken))?;

        let user = app_state
            .db
            .get_user_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Auth(AuthError::UserNotFound))?;

        debug!("Authenticated user: {} (id {})", user.email, user.id);
        Ok(CurrentUser(user))
    }
}
