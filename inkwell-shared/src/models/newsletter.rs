/// Newsletter subscribers
///
/// Subscribing hands back an unsubscribe token exactly once. Only the SHA-256
/// hash of the token is stored, so a database leak cannot be used to
/// unsubscribe people.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE newsletter_subscribers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,      -- stored lowercase
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,  -- hex SHA-256
///     subscribed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     unsubscribed_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::normalize_email;
use super::Page;

/// Random bytes behind an unsubscribe token
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// Result of a subscribe call; `token` is the only copy of the plaintext
#[derive(Debug, Clone)]
pub struct Subscription {
    pub subscriber: NewsletterSubscriber,
    pub token: String,
}

const SUBSCRIBER_COLUMNS: &str =
    "id, email, is_active, token_hash, subscribed_at, unsubscribed_at";

/// Generates a 64-char hex unsubscribe token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 of a token, as stored in `token_hash`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl NewsletterSubscriber {
    /// Subscribes or re-activates `email`, rotating its unsubscribe token
    ///
    /// The new token goes back to the caller, who has not proven ownership of
    /// the address. Anyone can therefore unsubscribe a known address.
    pub async fn subscribe(pool: &PgPool, email: &str) -> Result<Subscription, sqlx::Error> {
        let token = generate_token();

        let subscriber = sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            r#"
            INSERT INTO newsletter_subscribers (email, token_hash)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT newsletter_subscribers_email_key DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                is_active = TRUE,
                subscribed_at = CASE
                    WHEN newsletter_subscribers.is_active THEN newsletter_subscribers.subscribed_at
                    ELSE NOW()
                END,
                unsubscribed_at = NULL
            RETURNING {SUBSCRIBER_COLUMNS}
            "#
        ))
        .bind(normalize_email(email))
        .bind(hash_token(&token))
        .fetch_one(pool)
        .await?;

        Ok(Subscription { subscriber, token })
    }

    /// Deactivates the subscription owning `token`
    ///
    /// Returns `None` if no subscriber matches. Unsubscribing twice is harmless.
    pub async fn unsubscribe_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            r#"
            UPDATE newsletter_subscribers
            SET is_active = FALSE,
                unsubscribed_at = COALESCE(unsubscribed_at, NOW())
            WHERE token_hash = $1
            RETURNING {SUBSCRIBER_COLUMNS}
            "#
        ))
        .bind(hash_token(token.trim()))
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        active: Option<bool>,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsletterSubscriber>(&format!(
            r#"
            SELECT {SUBSCRIBER_COLUMNS}
            FROM newsletter_subscribers
            WHERE ($1::boolean IS NULL OR is_active = $1)
            ORDER BY subscribed_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(active)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool, active: Option<bool>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM newsletter_subscribers WHERE ($1::boolean IS NULL OR is_active = $1)",
        )
        .bind(active)
        .fetch_one(pool)
        .await
    }
}
