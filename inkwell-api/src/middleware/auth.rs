/// Dashboard authentication as an axum extractor
///
/// Gated handlers take an [`Authenticated`] argument. Extraction reads the
/// bearer header or `auth_token` cookie, validates the JWT against the
/// configured secret, and loads the user. Role checks then happen in the
/// handler with the helpers from `inkwell_shared::auth::authorization`.
///
/// ```no_run
/// use inkwell_api::{error::ApiResult, middleware::auth::Authenticated};
/// use inkwell_shared::auth::authorization::require_moderator;
///
/// async fn handler(Authenticated(auth): Authenticated) -> ApiResult<String> {
///     require_moderator(&auth)?;
///     Ok(format!("Hello, {}", auth.name))
/// }
/// ```

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use inkwell_shared::auth::context::{authenticate, extract_token, AuthContext};

use crate::app::AppState;
use crate::error::ApiError;

/// The active dashboard user behind the request
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(Self(auth.clone()));
        }

        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let cookie = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok());

        let token = extract_token(authorization, cookie)?;

        let auth = authenticate(&state.db, token, state.jwt_secret())
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Authentication failed");
                ApiError::from(e)
            })?;

        parts.extensions.insert(auth.clone());

        Ok(Self(auth))
    }
}
