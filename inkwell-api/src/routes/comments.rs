/// Threaded comments and moderation
///
/// # Endpoints
///
/// - `POST /api/comments` - Post a comment or reply (public, rate limited)
/// - `GET /api/comments/post/:post_id` - Approved comments as a tree (public)
/// - `GET /api/comments` - All comments, filterable (moderator)
/// - `GET /api/comments/stats` - Counts per status (moderator)
/// - `PATCH /api/comments/:id` - Change status (moderator)
/// - `DELETE /api/comments/:id` - Delete (moderator)
///
/// New comments get the configured default status (`approved` unless the
/// deployment pre-moderates). Public listings only ever contain approved
/// comments and never expose the commenter's device identifier.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use inkwell_shared::{
    auth::authorization::require_moderator,
    identity::AnonymousId,
    models::{
        comment::{Comment, CommentFilter, CommentStats, CommentStatus, CreateComment, PublicComment},
        user_activity::ActivityAction,
        Paginated,
    },
    threading::{build_thread, thread_size, ThreadNode},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    activity::{ensure_published, record_side_effect},
    non_blank, required_text, user_agent, PageQuery,
};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ApiQuery, ValidatedJson},
    },
};

/// Longest accepted comment body, in characters
pub const MAX_MESSAGE_LEN: u64 = 5000;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,

    /// Comment being replied to; replies to replies attach to the top-level comment
    pub parent_id: Option<Uuid>,

    pub user_identifier: String,

    /// Display name; anonymous when omitted
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub user_name: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentStatusRequest {
    pub status: CommentStatus,
}

/// Query string of `GET /api/comments`
#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub post_id: Option<Uuid>,
    pub status: Option<CommentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentStatsQuery {
    pub post_id: Option<Uuid>,
}

/// Public comment tree of one post
#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub post_id: Uuid,

    /// Number of approved comments, replies included
    pub total: usize,

    pub comments: Vec<ThreadNode<PublicComment>>,
}

/// Post a comment
///
/// ```text
/// POST /api/comments
/// Content-Type: application/json
///
/// {
///   "post_id": "550e8400-e29b-41d4-a716-446655440000",
///   "parent_id": null,
///   "user_identifier": "k3J9x0Qm2aT7",
///   "user_name": "Ada",
///   "message": "Great read!"
/// }
/// ```
///
/// # Errors
///
/// - `404`: post missing or unpublished
/// - `400`: parent missing or on another post
/// - `422`: invalid identifier or message
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let identifier = AnonymousId::parse(&req.user_identifier)?;

    let message = required_text("message", &req.message, "Message must not be blank")?;

    ensure_published(&state.db, req.post_id).await?;

    let parent_id = match req.parent_id {
        Some(requested) => Some(
            Comment::resolve_parent(&state.db, req.post_id, requested)
                .await?
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        ),
        None => None,
    };

    let comment = Comment::create(
        &state.db,
        CreateComment {
            post_id: req.post_id,
            parent_id,
            user_identifier: identifier.as_str().to_string(),
            user_name: non_blank(req.user_name),
            message,
            status: state.config.comments.default_status,
        },
    )
    .await?;

    record_side_effect(
        &state.db,
        comment.post_id,
        identifier.as_str(),
        ActivityAction::Comment,
        user_agent(&headers),
    )
    .await;

    tracing::info!(
        comment_id = %comment.id,
        post_id = %comment.post_id,
        status = comment.status.as_str(),
        is_reply = comment.parent_id.is_some(),
        "Comment created"
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Approved comments of a published post, nested by reply
pub async fn list_post_comments(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> ApiResult<Json<CommentThreadResponse>> {
    ensure_published(&state.db, post_id).await?;

    let approved = Comment::list_approved_for_post(&state.db, post_id).await?;
    let comments = build_thread(approved.into_iter().map(PublicComment::from).collect());

    Ok(Json(CommentThreadResponse {
        post_id,
        total: thread_size(&comments),
        comments,
    }))
}

/// Moderation listing, newest first
///
/// ```text
/// GET /api/comments?status=pending&post_id=...&limit=20&offset=0
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_comments(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<CommentListQuery>,
) -> ApiResult<Json<Paginated<Comment>>> {
    require_moderator(&auth)?;

    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    }
    .page();
    let filter = CommentFilter {
        post_id: query.post_id,
        status: query.status,
    };

    let items = Comment::list(&state.db, &filter, page).await?;
    let total = Comment::count(&state.db, &filter).await?;

    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn comment_stats(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<CommentStatsQuery>,
) -> ApiResult<Json<CommentStats>> {
    require_moderator(&auth)?;

    let stats = Comment::stats(&state.db, query.post_id).await?;
    Ok(Json(stats))
}

/// Move a comment to another moderation state
///
/// Any state may move to any other. Rejecting hides the comment from the
/// public tree; its replies then show up as top-level comments.
pub async fn update_comment_status(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCommentStatusRequest>,
) -> ApiResult<Json<Comment>> {
    require_moderator(&auth)?;

    let comment = Comment::update_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    tracing::info!(
        comment_id = %id,
        status = comment.status.as_str(),
        moderator_id = %auth.user_id,
        "Comment status updated"
    );

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_moderator(&auth)?;

    if !Comment::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    tracing::info!(comment_id = %id, moderator_id = %auth.user_id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id: Uuid::new_v4(),
            parent_id: None,
            user_identifier: "abcdefgh".to_string(),
            user_name: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_message_length_rules() {
        assert!(request("Nice post").validate().is_ok());
        assert!(request("").validate().is_err());
        assert!(request(&"x".repeat(MAX_MESSAGE_LEN as usize + 1)).validate().is_err());
    }

    #[test]
    fn test_status_request_parses_lowercase() {
        let req: UpdateCommentStatusRequest = serde_json::from_str(r#"{"status":"rejected"}"#).unwrap();
        assert_eq!(req.status, CommentStatus::Rejected);

        assert!(serde_json::from_str::<UpdateCommentStatusRequest>(r#"{"status":"spam"}"#).is_err());
    }
}
