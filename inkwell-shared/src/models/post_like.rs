/// Post likes, one per (post, anonymous identifier)
///
/// The `post_likes_post_user_key` unique constraint makes liking idempotent:
/// inserts use `ON CONFLICT DO NOTHING`, so a repeated like from the same
/// device (even concurrently) leaves exactly one row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE post_likes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
///     user_identifier VARCHAR(128) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT post_likes_post_user_key UNIQUE (post_id, user_identifier)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostLike {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_identifier: String,
    pub created_at: DateTime<Utc>,
}

/// Like state of a post from one device's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub post_id: Uuid,
    pub liked: bool,
    pub like_count: i64,
}

impl PostLike {
    /// Records a like
    ///
    /// Returns `true` if a new row was inserted, `false` if this identifier
    /// had already liked the post.
    ///
    /// # Errors
    ///
    /// Foreign key violation if the post does not exist.
    pub async fn like(
        pool: &PgPool,
        post_id: Uuid,
        user_identifier: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_identifier)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT post_likes_post_user_key DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_identifier)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Removes a like; `false` if there was nothing to remove
    pub async fn unlike(
        pool: &PgPool,
        post_id: Uuid,
        user_identifier: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_identifier = $2")
                .bind(post_id)
                .bind(user_identifier)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_post(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await
    }

    /// Current like count plus whether `user_identifier` is among the likers
    pub async fn state(
        pool: &PgPool,
        post_id: Uuid,
        user_identifier: &str,
    ) -> Result<LikeState, sqlx::Error> {
        let (liked, like_count): (bool, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(BOOL_OR(user_identifier = $2), FALSE),
                COUNT(*)
            FROM post_likes
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .bind(user_identifier)
        .fetch_one(pool)
        .await?;

        Ok(LikeState {
            post_id,
            liked,
            like_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_state_serializes_count() {
        let state = LikeState {
            post_id: Uuid::nil(),
            liked: true,
            like_count: 3,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["liked"], true);
        assert_eq!(json["like_count"], 3);
    }
}
