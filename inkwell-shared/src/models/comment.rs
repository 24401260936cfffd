/// Comment model and database operations
///
/// Comments are written by anonymous readers, identified only by their device
/// token, and moderated from the dashboard. A comment may reply to another
/// comment on the same post; replies are kept one level deep (see
/// [`Comment::resolve_parent`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE comment_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
///     parent_id UUID REFERENCES comments(id) ON DELETE SET NULL,
///     user_identifier VARCHAR(128) NOT NULL,
///     user_name VARCHAR(100),
///     message TEXT NOT NULL,
///     status comment_status NOT NULL DEFAULT 'approved',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Moderation
///
/// `status` is a flat field: a moderator can move a comment between any two
/// states at any time. Only `approved` comments are visible publicly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Page;
use crate::threading::ThreadItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "comment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

impl Default for CommentStatus {
    fn default() -> Self {
        CommentStatus::Approved
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CommentStatus::Pending),
            "approved" => Ok(CommentStatus::Approved),
            "rejected" => Ok(CommentStatus::Rejected),
            other => Err(format!("unknown comment status '{}'", other)),
        }
    }
}

/// Full comment row, as seen by moderators
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_identifier: String,
    pub user_name: Option<String>,
    pub message: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment as shown on the public site (no device identifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            user_name: comment.user_name,
            message: comment.message,
            created_at: comment.created_at,
        }
    }
}

impl ThreadItem for PublicComment {
    fn thread_id(&self) -> Uuid {
        self.id
    }

    fn thread_parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

impl ThreadItem for Comment {
    fn thread_id(&self) -> Uuid {
        self.id
    }

    fn thread_parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub post_id: Uuid,
    /// Already resolved to a top-level comment of the same post
    pub parent_id: Option<Uuid>,
    pub user_identifier: String,
    pub user_name: Option<String>,
    pub message: String,
    pub status: CommentStatus,
}

/// Moderator list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
    pub status: Option<CommentStatus>,
}

/// Per-status totals for the moderation queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

/// Why a reply target was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParentError {
    #[error("Parent comment not found")]
    NotFound,

    #[error("Parent comment belongs to a different post")]
    DifferentPost,
}

const COMMENT_COLUMNS: &str =
    "id, post_id, parent_id, user_identifier, user_name, message, status, created_at, updated_at";

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (post_id, parent_id, user_identifier, user_name, message, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(data.post_id)
        .bind(data.parent_id)
        .bind(data.user_identifier)
        .bind(data.user_name)
        .bind(data.message)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Resolves the parent a new reply should attach to
    ///
    /// The requested parent must exist on the same post. Replying to a reply
    /// attaches to that reply's own parent, keeping threads one level deep.
    pub async fn resolve_parent(
        pool: &PgPool,
        post_id: Uuid,
        requested_parent: Uuid,
    ) -> Result<Result<Uuid, ParentError>, sqlx::Error> {
        let parent = Self::find_by_id(pool, requested_parent).await?;
        Ok(resolve_parent_of(post_id, parent.as_ref()))
    }

    /// Approved comments of one post, oldest first
    pub async fn list_approved_for_post(
        pool: &PgPool,
        post_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = $1 AND status = 'approved'
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(post_id)
        .fetch_all(pool)
        .await
    }

    /// All comments matching `filter`, newest first (moderation view)
    pub async fn list(
        pool: &PgPool,
        filter: &CommentFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE ($1::uuid IS NULL OR post_id = $1)
              AND ($2::comment_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.post_id)
        .bind(filter.status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool, filter: &CommentFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM comments
            WHERE ($1::uuid IS NULL OR post_id = $1)
              AND ($2::comment_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.post_id)
        .bind(filter.status)
        .fetch_one(pool)
        .await
    }

    /// Totals per status, optionally for one post
    pub async fn stats(pool: &PgPool, post_id: Option<Uuid>) -> Result<CommentStats, sqlx::Error> {
        let rows: Vec<(CommentStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM comments
            WHERE ($1::uuid IS NULL OR post_id = $1)
            GROUP BY status
            "#,
        )
        .bind(post_id)
        .fetch_all(pool)
        .await?;

        Ok(CommentStats::from_counts(rows))
    }

    /// Sets the moderation status; `None` if the comment does not exist
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a comment; its replies stay and become top-level
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Pure part of [`Comment::resolve_parent`]
fn resolve_parent_of(post_id: Uuid, parent: Option<&Comment>) -> Result<Uuid, ParentError> {
    let parent = parent.ok_or(ParentError::NotFound)?;

    if parent.post_id != post_id {
        return Err(ParentError::DifferentPost);
    }

    Ok(parent.parent_id.unwrap_or(parent.id))
}

impl CommentStats {
    fn from_counts(rows: impl IntoIterator<Item = (CommentStatus, i64)>) -> Self {
        let mut stats = CommentStats::default();
        for (status, count) in rows {
            match status {
                CommentStatus::Pending => stats.pending += count,
                CommentStatus::Approved => stats.approved += count,
                CommentStatus::Rejected => stats.rejected += count,
            }
            stats.total += count;
        }
        stats
    }
}
