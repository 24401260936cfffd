/// Anonymous interaction log
///
/// # Endpoints
///
/// - `POST /api/activity` - Record an interaction (public, rate limited)
/// - `GET /api/activity` - Filtered log (editor)
/// - `GET /api/activity/post/:post_id/summary` - Per-post totals (editor)
///
/// Likes and comments also append rows here through [`record_side_effect`].

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use inkwell_shared::{
    auth::authorization::require_editor,
    identity::AnonymousId,
    models::{
        post::Post,
        user_activity::{ActivityAction, ActivityFilter, ActivitySummary, RecordActivity, UserActivity},
        Paginated, Page,
    },
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{user_agent, PageQuery};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ApiQuery, ValidatedJson},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordActivityRequest {
    pub post_id: Uuid,

    pub user_identifier: String,

    pub action_type: ActivityAction,

    /// Falls back to the request's `User-Agent`
    #[validate(length(max = 2048, message = "Device info is too long"))]
    pub device_info: Option<String>,
}

/// Query string of `GET /api/activity`
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub post_id: Option<Uuid>,
    pub user_identifier: Option<String>,
    pub action_type: Option<ActivityAction>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ActivityQuery {
    fn into_parts(self) -> (ActivityFilter, Page) {
        let page = PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .page();

        let filter = ActivityFilter {
            post_id: self.post_id,
            user_identifier: self.user_identifier,
            action_type: self.action_type,
        };

        (filter, page)
    }
}

/// Record an interaction
///
/// ```text
/// POST /api/activity
/// Content-Type: application/json
///
/// {
///   "post_id": "550e8400-e29b-41d4-a716-446655440000",
///   "user_identifier": "k3J9x0Qm2aT7",
///   "action_type": "view"
/// }
/// ```
///
/// The post must be published. Returns 201 with the stored row.
pub async fn record_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RecordActivityRequest>,
) -> ApiResult<(StatusCode, Json<UserActivity>)> {
    let identifier = AnonymousId::parse(&req.user_identifier)?;
    ensure_published(&state.db, req.post_id).await?;

    let activity = UserActivity::record(
        &state.db,
        RecordActivity {
            post_id: req.post_id,
            user_identifier: identifier.into(),
            action_type: req.action_type,
            device_info: req.device_info.or_else(|| user_agent(&headers)),
        },
    )
    .await?;

    tracing::debug!(
        post_id = %activity.post_id,
        action = ?activity.action_type,
        "Activity recorded"
    );

    Ok((StatusCode::CREATED, Json(activity)))
}

/// Filtered activity log, newest first
pub async fn list_activity(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Paginated<UserActivity>>> {
    require_editor(&auth)?;

    let (filter, page) = query.into_parts();
    let items = UserActivity::list(&state.db, &filter, page).await?;
    let total = UserActivity::count(&state.db, &filter).await?;

    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn post_summary(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(post_id): ApiPath<Uuid>,
) -> ApiResult<Json<ActivitySummary>> {
    require_editor(&auth)?;

    if Post::find_by_id(&state.db, post_id).await?.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let summary = UserActivity::summary_for_post(&state.db, post_id).await?;
    Ok(Json(summary))
}

/// 404 unless the post exists and is published
pub(crate) async fn ensure_published(db: &PgPool, post_id: Uuid) -> ApiResult<()> {
    if Post::is_published(db, post_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Post not found".to_string()))
    }
}

/// Appends an activity row for a like or comment
///
/// Failures are logged and swallowed: the interaction itself already
/// succeeded and the log is secondary.
pub(crate) async fn record_side_effect(
    db: &PgPool,
    post_id: Uuid,
    user_identifier: &str,
    action_type: ActivityAction,
    device_info: Option<String>,
) {
    let result = UserActivity::record(
        db,
        RecordActivity {
            post_id,
            user_identifier: user_identifier.to_string(),
            action_type,
            device_info,
        },
    )
    .await;

    if let Err(e) = result {
        tracing::warn!(
            post_id = %post_id,
            action = ?action_type,
            error = %e,
            "Failed to record activity"
        );
    }
}
