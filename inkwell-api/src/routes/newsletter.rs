/// Newsletter subscriptions
///
/// # Endpoints
///
/// - `POST /api/newsletter/subscribe` - Subscribe or re-activate (public, rate limited)
/// - `POST /api/newsletter/unsubscribe` - Unsubscribe with the token (public, rate limited)
/// - `GET /api/newsletter/subscribers` - Subscriber list (admin)
///
/// Each subscribe call returns a fresh unsubscribe token. Only its SHA-256
/// hash is stored, so the plaintext is shown exactly once.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use inkwell_shared::{
    auth::authorization::require_admin,
    models::{newsletter::NewsletterSubscriber, Paginated},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::PageQuery;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiQuery, ValidatedJson},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(
        email(message = "Invalid email address"),
        length(max = 254, message = "Email is too long")
    )]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnsubscribeRequest {
    #[validate(length(min = 1, max = 128, message = "Invalid unsubscribe token"))]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub email: String,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,

    /// Plaintext unsubscribe token, only returned here
    pub unsubscribe_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriberQuery {
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Subscribe
///
/// ```text
/// POST /api/newsletter/subscribe
/// Content-Type: application/json
///
/// {"email": "reader@example.com"}
/// ```
///
/// Subscribing an existing address re-activates it and rotates its token.
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SubscribeRequest>,
) -> ApiResult<Json<SubscribeResponse>> {
    let subscription = NewsletterSubscriber::subscribe(&state.db, &req.email).await?;

    tracing::info!(subscriber_id = %subscription.subscriber.id, "Newsletter subscription");

    Ok(Json(SubscribeResponse {
        email: subscription.subscriber.email,
        is_active: subscription.subscriber.is_active,
        subscribed_at: subscription.subscriber.subscribed_at,
        unsubscribe_token: subscription.token,
    }))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UnsubscribeRequest>,
) -> ApiResult<Json<NewsletterSubscriber>> {
    let subscriber = NewsletterSubscriber::unsubscribe_by_token(&state.db, &req.token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Unknown unsubscribe token".to_string()))?;

    tracing::info!(subscriber_id = %subscriber.id, "Newsletter unsubscription");

    Ok(Json(subscriber))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<SubscriberQuery>,
) -> ApiResult<Json<Paginated<NewsletterSubscriber>>> {
    require_admin(&auth)?;

    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .page();

    let items = NewsletterSubscriber::list(&state.db, query.active, page).await?;
    let total = NewsletterSubscriber::count(&state.db, query.active).await?;

    Ok(Json(Paginated::new(items, total, page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_validates_email() {
        let ok = SubscribeRequest {
            email: "reader@example.com".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = SubscribeRequest {
            email: "not-an-email".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unsubscribe_request_requires_token() {
        let req = UnsubscribeRequest {
            token: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
