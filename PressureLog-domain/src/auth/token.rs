use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::auth::Claims;

/// Default token issuer
pub const DEFAULT_ISSUER: &str = "pressure-log-api";

/// Default access token lifetime (one day)
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 1440;

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),
}

/// Settings for issuing and checking HS256 access tokens
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    /// `iss` claim written and required
    pub issuer: String,
    /// Access token lifetime in minutes
    pub expiration_minutes: i64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

impl TokenConfig {
    /// Create a token configuration. The secret must not be empty.
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expiration_minutes: i64) -> Result<Self, SecurityError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SecurityError::ConfigError("JWT secret must not be empty".to_string()));
        }

        Ok(Self {
            secret,
            issuer: issuer.into(),
            expiration_minutes,
        })
    }

    fn expiration(&self) -> Duration {
        Duration::minutes(self.expiration_minutes)
    }
}

/// Generate a signed access token for a user
pub fn generate_token(config: &TokenConfig, user_id: &str, roles: Vec<String>) -> Result<String, SecurityError> {
    let now = Utc::now();
    let expiration = now + config.expiration();

    let claims = Claims {
        sub: user_id.to_string(),
        iss: config.issuer.clone(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
        roles,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })?;

    // Log token generation (but not the token itself)
    info!("Generated access token for user {}", user_id);
    debug!("Token expiration: {}", expiration);

    Ok(token)
}

/// Validate a token and return the decoded claims
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<Claims, SecurityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_issuer(&[config.issuer.as_str()]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => {
            SecurityError::TokenValidation("Invalid signature".to_string())
        }
        _ => SecurityError::TokenValidation(e.to_string()),
    })?;

    Ok(token_data.claims)
}
