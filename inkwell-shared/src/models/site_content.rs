/// CMS-editable content blocks
///
/// A block is addressed by `(page_key, section_key)` and carries arbitrary JSON
/// the public site uses to override its default copy. Writes are upserts, so
/// concurrent saves of the same block resolve to the last one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE site_content (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     page_key VARCHAR(100) NOT NULL,
///     section_key VARCHAR(100) NOT NULL,
///     content JSONB NOT NULL,
///     image_url VARCHAR(1024),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT site_content_page_section_key UNIQUE (page_key, section_key)
/// );
/// ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteContent {
    pub id: Uuid,
    pub page_key: String,
    pub section_key: String,
    pub content: serde_json::Value,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpsertSiteContent {
    pub page_key: String,
    pub section_key: String,
    pub content: serde_json::Value,
    pub image_url: Option<String>,
}

const SITE_CONTENT_COLUMNS: &str =
    "id, page_key, section_key, content, image_url, created_at, updated_at";

impl SiteContent {
    /// Creates the block or replaces its content and image
    pub async fn upsert(pool: &PgPool, data: UpsertSiteContent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SiteContent>(&format!(
            r#"
            INSERT INTO site_content (page_key, section_key, content, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT site_content_page_section_key DO UPDATE
            SET content = EXCLUDED.content,
                image_url = EXCLUDED.image_url,
                updated_at = NOW()
            RETURNING {SITE_CONTENT_COLUMNS}
            "#
        ))
        .bind(data.page_key)
        .bind(data.section_key)
        .bind(data.content)
        .bind(data.image_url)
        .fetch_one(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        page_key: &str,
        section_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SiteContent>(&format!(
            "SELECT {SITE_CONTENT_COLUMNS} FROM site_content WHERE page_key = $1 AND section_key = $2"
        ))
        .bind(page_key)
        .bind(section_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_page(pool: &PgPool, page_key: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SiteContent>(&format!(
            r#"
            SELECT {SITE_CONTENT_COLUMNS}
            FROM site_content
            WHERE page_key = $1
            ORDER BY section_key ASC
            "#
        ))
        .bind(page_key)
        .fetch_all(pool)
        .await
    }

    /// Every block, grouped by page (dashboard overview)
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SiteContent>(&format!(
            "SELECT {SITE_CONTENT_COLUMNS} FROM site_content ORDER BY page_key ASC, section_key ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn delete(
        pool: &PgPool,
        page_key: &str,
        section_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM site_content WHERE page_key = $1 AND section_key = $2")
                .bind(page_key)
                .bind(section_key)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Indexes one page's blocks by section key
pub fn page_map(blocks: Vec<SiteContent>) -> BTreeMap<String, SiteContent> {
    blocks
        .into_iter()
        .map(|block| (block.section_key.clone(), block))
        .collect()
}
