//! Authentication for the PressureLog API
//!
//! Bearer-token middleware for protected routes and role checks for
//! administrator routes. Tokens are HS256 JWTs issued at login.

use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

// JWT issuing and validation
pub mod token;

pub use token::{generate_token, validate_token, SecurityError, TokenConfig};

/// Role given to every authenticated user
pub const ROLE_USER: &str = "user";

/// Role required for user administration
pub const ROLE_ADMIN: &str = "admin";

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Identity attached to the request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Whether the user holds a role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
        }
    }
}

/// Roles granted to an identity at login
pub fn roles_for(open_id: &str, admin_open_ids: &[String]) -> Vec<String> {
    let mut roles = vec![ROLE_USER.to_string()];
    if admin_open_ids.iter().any(|admin| admin == open_id) {
        roles.push(ROLE_ADMIN.to_string());
    }
    roles
}

#[cfg(feature = "with-axum")]
mod middleware;

#[cfg(feature = "with-axum")]
pub use middleware::{auth_middleware, require_admin};
