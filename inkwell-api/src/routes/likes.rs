/// Per-device likes
///
/// A like is keyed by `(post_id, user_identifier)`. Liking twice or unliking
/// a post that was never liked is a no-op; both return the current state, so
/// clients can fire these calls without tracking what they sent before.
///
/// # Endpoints
///
/// - `POST /api/likes` - Like a post
/// - `DELETE /api/likes` - Remove a like
/// - `GET /api/likes/count/:post_id` - Like count
/// - `GET /api/likes/status/:post_id?user_identifier=` - Count plus "liked by me"

use axum::{extract::State, http::HeaderMap, Json};
use inkwell_shared::{
    identity::AnonymousId,
    models::{
        post_like::{LikeState, PostLike},
        user_activity::ActivityAction,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    activity::{ensure_published, record_side_effect},
    user_agent,
};
use crate::{
    app::AppState,
    error::ApiResult,
    middleware::extract::{ApiPath, ApiQuery, ValidatedJson},
};

#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    pub post_id: Uuid,
    pub user_identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct LikeStatusQuery {
    pub user_identifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeCountResponse {
    pub post_id: Uuid,
    pub like_count: i64,
}

/// Like a post
///
/// ```text
/// POST /api/likes
/// Content-Type: application/json
///
/// {"post_id": "550e8400-e29b-41d4-a716-446655440000", "user_identifier": "k3J9x0Qm2aT7"}
/// ```
///
/// ```json
/// {"post_id": "550e8400-e29b-41d4-a716-446655440000", "liked": true, "like_count": 12}
/// ```
///
/// Only a newly inserted like is logged as activity.
pub async fn like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LikeRequest>,
) -> ApiResult<Json<LikeState>> {
    let identifier = AnonymousId::parse(&req.user_identifier)?;
    ensure_published(&state.db, req.post_id).await?;

    let inserted = PostLike::like(&state.db, req.post_id, identifier.as_str()).await?;

    if inserted {
        record_side_effect(
            &state.db,
            req.post_id,
            identifier.as_str(),
            ActivityAction::Like,
            user_agent(&headers),
        )
        .await;
    }

    tracing::debug!(post_id = %req.post_id, inserted, "Like processed");

    let like_state = PostLike::state(&state.db, req.post_id, identifier.as_str()).await?;
    Ok(Json(like_state))
}

/// Remove a like; same body as [`like_post`]
pub async fn unlike_post(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LikeRequest>,
) -> ApiResult<Json<LikeState>> {
    let identifier = AnonymousId::parse(&req.user_identifier)?;
    ensure_published(&state.db, req.post_id).await?;

    let removed = PostLike::unlike(&state.db, req.post_id, identifier.as_str()).await?;
    tracing::debug!(post_id = %req.post_id, removed, "Unlike processed");

    let like_state = PostLike::state(&state.db, req.post_id, identifier.as_str()).await?;
    Ok(Json(like_state))
}

pub async fn like_count(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> ApiResult<Json<LikeCountResponse>> {
    ensure_published(&state.db, post_id).await?;

    let like_count = PostLike::count_for_post(&state.db, post_id).await?;
    Ok(Json(LikeCountResponse { post_id, like_count }))
}

pub async fn like_status(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<LikeStatusQuery>,
) -> ApiResult<Json<LikeState>> {
    let identifier = AnonymousId::parse(&query.user_identifier)?;
    ensure_published(&state.db, post_id).await?;

    let like_state = PostLike::state(&state.db, post_id, identifier.as_str()).await?;
    Ok(Json(like_state))
}
