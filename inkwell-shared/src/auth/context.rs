/// Resolving a request's credentials into an authenticated dashboard user
///
/// Credentials arrive either as `Authorization: Bearer <jwt>` or as the
/// `auth_token` cookie set by the dashboard. The bearer header wins when both
/// are present. Once the token validates, the user is loaded fresh from the
/// database so role changes and deletions take effect immediately.
///
/// This module is framework-free; the API crate wraps [`authenticate`] in an
/// axum extractor.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{User, UserRole};

/// Cookie the dashboard stores its token in
pub const AUTH_COOKIE: &str = "auth_token";

/// The authenticated caller of a gated route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    /// Builds a context for an active user
    pub fn from_user(user: &User) -> Result<Self, AuthError> {
        if !user.is_active() {
            return Err(AuthError::AccountPending);
        }

        Ok(Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    /// The token is valid but its user no longer exists
    #[error("Unknown user")]
    UnknownUser,

    #[error("Account is pending approval")]
    AccountPending,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Picks the token out of the `Authorization` and `Cookie` header values
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Result<&'a str, AuthError> {
    if let Some(header) = authorization {
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;
        return Ok(token);
    }

    cookie
        .and_then(token_from_cookie)
        .ok_or(AuthError::MissingCredentials)
}

fn token_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Validates `token` and loads the active user it belongs to
pub async fn authenticate(
    pool: &PgPool,
    token: &str,
    secret: &str,
) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    AuthContext::from_user(&user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserStatus;
    use chrono::Utc;

    fn user(status: UserStatus) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Mod".to_string(),
            email: "mod@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::Moderator,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(extract_token(Some("Bearer abc.def"), None).unwrap(), "abc.def");
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let token = extract_token(Some("Bearer from-header"), Some("auth_token=from-cookie"));
        assert_eq!(token.unwrap(), "from-header");
    }

    #[test]
    fn test_cookie_fallback() {
        let token = extract_token(None, Some("theme=dark; auth_token=abc.def; lang=en"));
        assert_eq!(token.unwrap(), "abc.def");
    }

    #[test]
    fn test_missing_and_malformed() {
        assert!(matches!(
            extract_token(None, None),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            extract_token(None, Some("theme=dark")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            extract_token(Some("Basic dXNlcjpwYXNz"), None),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            extract_token(Some("Bearer "), None),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_from_user_requires_active() {
        assert!(matches!(
            AuthContext::from_user(&user(UserStatus::Pending)),
            Err(AuthError::AccountPending)
        ));

        let ctx = AuthContext::from_user(&user(UserStatus::Active)).unwrap();
        assert_eq!(ctx.role, UserRole::Moderator);
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert!(matches!(AuthError::from(JwtError::Expired), AuthError::TokenExpired));
        assert!(matches!(
            AuthError::from(JwtError::InvalidIssuer),
            AuthError::InvalidToken(_)
        ));
    }
}
