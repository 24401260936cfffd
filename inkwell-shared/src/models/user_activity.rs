/// Append-only log of anonymous interactions with posts
///
/// Rows are never updated. They disappear only when their post is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE activity_action AS ENUM ('like', 'comment', 'view');
///
/// CREATE TABLE user_activity (
///     id BIGSERIAL PRIMARY KEY,
///     post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
///     user_identifier VARCHAR(128) NOT NULL,
///     action_type activity_action NOT NULL,
///     device_info VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Page;

/// Longest `device_info` the column holds
pub const MAX_DEVICE_INFO_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Like,
    Comment,
    View,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserActivity {
    pub id: i64,
    pub post_id: Uuid,
    pub user_identifier: String,
    pub action_type: ActivityAction,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordActivity {
    pub post_id: Uuid,
    pub user_identifier: String,
    pub action_type: ActivityAction,
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub post_id: Option<Uuid>,
    pub user_identifier: Option<String>,
    pub action_type: Option<ActivityAction>,
}

/// Interaction totals for one post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub post_id: Uuid,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    pub unique_visitors: i64,
}

const ACTIVITY_COLUMNS: &str =
    "id, post_id, user_identifier, action_type, device_info, created_at";

const ACTIVITY_FILTERS: &str = r#"
    ($1::uuid IS NULL OR post_id = $1)
    AND ($2::varchar IS NULL OR user_identifier = $2)
    AND ($3::activity_action IS NULL OR action_type = $3)
"#;

/// Truncates to the column width on a char boundary
pub fn clamp_device_info(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DEVICE_INFO_LEN).collect())
}

impl UserActivity {
    pub async fn record(pool: &PgPool, data: RecordActivity) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserActivity>(&format!(
            r#"
            INSERT INTO user_activity (post_id, user_identifier, action_type, device_info)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(data.post_id)
        .bind(data.user_identifier)
        .bind(data.action_type)
        .bind(data.device_info.as_deref().and_then(clamp_device_info))
        .fetch_one(pool)
        .await
    }

    /// Newest first
    pub async fn list(
        pool: &PgPool,
        filter: &ActivityFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserActivity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM user_activity
            WHERE {ACTIVITY_FILTERS}
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.post_id)
        .bind(filter.user_identifier.as_deref())
        .bind(filter.action_type)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool, filter: &ActivityFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM user_activity WHERE {ACTIVITY_FILTERS}"
        ))
        .bind(filter.post_id)
        .bind(filter.user_identifier.as_deref())
        .bind(filter.action_type)
        .fetch_one(pool)
        .await
    }

    pub async fn summary_for_post(
        pool: &PgPool,
        post_id: Uuid,
    ) -> Result<ActivitySummary, sqlx::Error> {
        let (likes, comments, views, unique_visitors): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE action_type = 'like'),
                COUNT(*) FILTER (WHERE action_type = 'comment'),
                COUNT(*) FILTER (WHERE action_type = 'view'),
                COUNT(DISTINCT user_identifier)
            FROM user_activity
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(pool)
        .await?;

        Ok(ActivitySummary {
            post_id,
            likes,
            comments,
            views,
            unique_visitors,
        })
    }
}
