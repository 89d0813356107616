//! Registration and login routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use tracing::{debug, info};

use taskboard_auth::{AuthError, DUMMY_PASSWORD_HASH, hash_password, verify_password};
use taskboard_db::{NewUser, utils::normalize_email};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};

// ==================== Input Validation ====================

/// Minimum allowed password length
const MIN_PASSWORD_LENGTH: usize = 6;
/// Maximum allowed password length (bounds hashing cost for a single request)
const MAX_PASSWORD_LENGTH: usize = 256;
/// Maximum allowed email length
const MAX_EMAIL_LENGTH: usize = 254;

/// Validate email syntax
///
/// Deliberately loose: one `@`, a non-empty local part, and a domain with a
/// dot. Deliverability is the mail server's problem.
fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    };
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
        || email.matches('@').count() != 1
    {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

/// Validate password length
fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Auth Routes ====================

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = normalize_email(&request.email);

    validate_email(&email)?;
    validate_password(&request.password)?;
    if request.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Full name cannot be empty".to_string()));
    }

    debug!("Registering user: {}", email);

    let password_hash = hash_password(&request.password)?;

    let user = state
        .db
        .insert_user(NewUser {
            email,
            full_name: request.full_name.trim().to_string(),
            password_hash,
        })
        .await?;

    info!("Registered user: {}", user.email);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if request.password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::Auth(AuthError::InvalidCredentials));
    }

    let email = normalize_email(&request.email);
    debug!("Login attempt for: {}", email);

    // Look up the user, but don't return early: the unknown-email path must
    // do the same hash verification work as the wrong-password path.
    let user_result = state.db.get_user_by_email(&email).await?;

    let (hash_to_verify, user) = match user_result {
        Some(u) => (u.password_hash.clone(), Some(u)),
        None => (DUMMY_PASSWORD_HASH.to_string(), None),
    };

    let password_valid = verify_password(&request.password, &hash_to_verify)?;

    // One generic failure for unknown email, wrong password, and inactive user
    let user = match (user, password_valid) {
        (Some(u), true) if u.is_active => u,
        _ => return Err(ApiError::Auth(AuthError::InvalidCredentials)),
    };

    let token = state.jwt.generate_token(user.id)?;

    info!("User {} logged in", user.email);

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("nodomain").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@@x.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(257)).is_err());
    }
}
