/// Post model and database operations
///
/// Posts are the blog articles. Rows are always returned joined with their
/// category and author names so list and detail responses need no second
/// lookup. Deleting a post cascades to its comments, likes and activity rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE posts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(300) NOT NULL,
///     slug VARCHAR(200) NOT NULL UNIQUE,
///     excerpt TEXT,
///     content TEXT NOT NULL,
///     metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
///     cover_image_url VARCHAR(1024),
///     category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
///     author_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     is_published BOOLEAN NOT NULL DEFAULT FALSE,
///     is_featured BOOLEAN NOT NULL DEFAULT FALSE,
///     published_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Publishing
///
/// `published_at` is stamped the first time `is_published` becomes true and is
/// kept when a post is unpublished and republished, so the public ordering of
/// an article never jumps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::Page;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,

    /// Free-form JSON object (SEO fields, reading time, ...)
    pub metadata: JsonValue,

    pub cover_image_url: Option<String>,

    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,

    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,

    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub metadata: JsonValue,
    pub cover_image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub is_published: bool,
    pub is_featured: bool,
}

/// Partial update; nullable columns use `Some(None)` to clear
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub metadata: Option<JsonValue>,
    pub cover_image_url: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
}

/// List filters; every `None` means "don't filter on this"
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PostFilter {
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
    pub category_slug: Option<String>,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
}

impl PostFilter {
    /// Filter used by the public site: published posts only
    pub fn public() -> Self {
        Self {
            published: Some(true),
            ..Default::default()
        }
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

const POST_SELECT: &str = r#"
    p.id, p.title, p.slug, p.excerpt, p.content, p.metadata, p.cover_image_url,
    p.category_id, c.name AS category_name, c.slug AS category_slug,
    p.author_id, u.name AS author_name,
    p.is_published, p.is_featured, p.published_at, p.created_at, p.updated_at
"#;

const POST_JOINS: &str = r#"
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN users u ON u.id = p.author_id
"#;

const POST_FILTERS: &str = r#"
    ($1::bool IS NULL OR p.is_published = $1)
    AND ($2::bool IS NULL OR p.is_featured = $2)
    AND ($3::uuid IS NULL OR p.category_id = $3)
    AND ($4::text IS NULL OR c.slug = $4)
    AND ($5::text IS NULL OR p.title ILIKE $5)
"#;

fn normalize_metadata(metadata: JsonValue) -> JsonValue {
    match metadata {
        JsonValue::Object(_) => metadata,
        _ => JsonValue::Object(Default::default()),
    }
}

impl Post {
    /// Inserts a post
    ///
    /// # Errors
    ///
    /// - Unique violation on `posts_slug_key` for a duplicate slug
    /// - Foreign-key violation for an unknown category
    pub async fn create(pool: &PgPool, data: CreatePost) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            WITH p AS (
                INSERT INTO posts (title, slug, excerpt, content, metadata, cover_image_url,
                                   category_id, author_id, is_published, is_featured, published_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        CASE WHEN $9 THEN NOW() ELSE NULL END)
                RETURNING *
            )
            SELECT {POST_SELECT} FROM p {POST_JOINS}
            "#
        ))
        .bind(data.title)
        .bind(data.slug)
        .bind(data.excerpt)
        .bind(data.content)
        .bind(normalize_metadata(data.metadata))
        .bind(data.cover_image_url)
        .bind(data.category_id)
        .bind(data.author_id)
        .bind(data.is_published)
        .bind(data.is_featured)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_SELECT} FROM posts p {POST_JOINS} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Public lookup: drafts are invisible
    pub async fn find_published_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_SELECT} FROM posts p {POST_JOINS} WHERE p.slug = $1 AND p.is_published = TRUE"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// True if the post exists and is published
    ///
    /// Public interactions (comments, likes, activity) only target such posts.
    pub async fn is_published(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1 AND is_published = TRUE)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lists posts matching `filter`
    ///
    /// Ordered by `published_at` (drafts last), then creation time, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &PostFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_SELECT}
            FROM posts p {POST_JOINS}
            WHERE {POST_FILTERS}
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.published)
        .bind(filter.featured)
        .bind(filter.category_id)
        .bind(filter.category_slug.as_deref())
        .bind(filter.search_pattern())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool, filter: &PostFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE {POST_FILTERS}"
        ))
        .bind(filter.published)
        .bind(filter.featured)
        .bind(filter.category_id)
        .bind(filter.category_slug.as_deref())
        .bind(filter.search_pattern())
        .fetch_one(pool)
        .await
    }

    /// Applies a partial update; `None` if the post does not exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePost,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (set_excerpt, excerpt) = split_nullable(data.excerpt);
        let (set_cover, cover_image_url) = split_nullable(data.cover_image_url);
        let (set_category, category_id) = split_nullable(data.category_id);

        sqlx::query_as::<_, Post>(&format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET title = COALESCE($2, title),
                    slug = COALESCE($3, slug),
                    excerpt = CASE WHEN $4 THEN $5 ELSE excerpt END,
                    content = COALESCE($6, content),
                    metadata = COALESCE($7, metadata),
                    cover_image_url = CASE WHEN $8 THEN $9 ELSE cover_image_url END,
                    category_id = CASE WHEN $10 THEN $11 ELSE category_id END,
                    is_published = COALESCE($12, is_published),
                    is_featured = COALESCE($13, is_featured),
                    published_at = CASE
                        WHEN COALESCE($12, is_published) AND published_at IS NULL THEN NOW()
                        ELSE published_at
                    END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_SELECT} FROM p {POST_JOINS}
            "#
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.slug)
        .bind(set_excerpt)
        .bind(excerpt)
        .bind(data.content)
        .bind(data.metadata.map(normalize_metadata))
        .bind(set_cover)
        .bind(cover_image_url)
        .bind(set_category)
        .bind(category_id)
        .bind(data.is_published)
        .bind(data.is_featured)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a post together with its comments, likes and activity
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Splits a "maybe clear" field into (should_set, value) SQL parameters
fn split_nullable<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}
