//! JWT session token management

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
    /// Token ID, random per token so two logins in the same second
    /// never produce byte-identical tokens
    pub jti: String,
}

/// JWT manager for token generation and validation
///
/// Holds the process-wide signing secret; constructed once at startup from
/// configuration and shared read-only across requests.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    token_lifetime: Duration,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, algorithm: Algorithm, token_lifetime_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            token_lifetime: Duration::minutes(token_lifetime_minutes),
        }
    }

    /// Generate a session token for a user
    pub fn generate_token(&self, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + self.token_lifetime;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!("Generating token for user id: {}", user_id);

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Validate a session token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validate a session token against an explicit clock
    ///
    /// Expiry is checked at whole-second granularity and the boundary is
    /// exclusive: a token is rejected from the `exp` instant onward, so it is
    /// only accepted strictly before `iat + lifetime`.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is compared manually below so the clock can be injected
        validation.validate_exp = false;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if now.timestamp() >= token_data.claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-key", Algorithm::HS256, 30)
    }

    #[test]
    fn test_token_generation_and_validation() {
        let manager = manager();

        let token = manager.generate_token(1).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "1");
        assert_eq!(claims.exp, claims.iat + 30 * 60);
    }

    #[test]
    fn test_invalid_token() {
        let result = manager().validate_token("garbage");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = manager().generate_token(1).unwrap();

        let other = JwtManager::new("another-secret", Algorithm::HS256, 30);
        let result = other.validate_token(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = manager();
        let token = manager.generate_token(1).unwrap();

        // Flip one character in each of the three segments
        for segment in 0..3 {
            let mut parts: Vec<String> =
                token.split('.').map(|s| s.to_string()).collect();
            let replacement = if parts[segment].starts_with('A') { "B" } else { "A" };
            parts[segment].replace_range(0..1, replacement);
            let tampered = parts.join(".");

            let result = manager.validate_token(&tampered);
            assert!(
                matches!(result, Err(AuthError::InvalidToken)),
                "tampered segment {} was accepted",
                segment
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let manager = manager();
        let token = manager.generate_token(1).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        let just_before = DateTime::from_timestamp(claims.exp - 1, 0).unwrap();
        assert!(manager.validate_token_at(&token, just_before).is_ok());

        // Rejected at exactly the expiry instant
        let at_expiry = DateTime::from_timestamp(claims.exp, 0).unwrap();
        assert!(matches!(
            manager.validate_token_at(&token, at_expiry),
            Err(AuthError::TokenExpired)
        ));

        let after = DateTime::from_timestamp(claims.exp + 60, 0).unwrap();
        assert!(matches!(
            manager.validate_token_at(&token, after),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_tokens_are_unique_per_login() {
        let manager = manager();

        let first = manager.generate_token(1).unwrap();
        let second = manager.generate_token(1).unwrap();
        assert_ne!(first, second);
    }
}
