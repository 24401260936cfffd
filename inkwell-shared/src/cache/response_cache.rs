/// Read-through JSON cache for public read endpoints
///
/// Values are stored as JSON strings under `inkwell:cache:<key>` with a fixed
/// TTL. Every failure (timeout, connection loss, undecodable value) is logged
/// and treated as a miss, so callers always fall back to the database.
///
/// # Example
///
/// ```no_run
/// use inkwell_shared::cache::{keys, ResponseCache};
/// use inkwell_shared::models::category::Category;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, cache: ResponseCache) -> Result<(), sqlx::Error> {
/// let categories = cache
///     .get_or_load(&keys::active_categories(), || Category::list(&pool, true))
///     .await?;
///
/// // after a write
/// cache.invalidate_prefix(keys::CATEGORIES_PREFIX).await;
/// # Ok(())
/// # }
/// ```

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::RedisClient;
use super::CacheError;

/// Namespace for every cache entry
pub const KEY_PREFIX: &str = "inkwell:cache:";

#[derive(Clone)]
pub struct ResponseCache {
    client: Option<RedisClient>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(client: RedisClient, ttl: Duration) -> Self {
        Self {
            client: Some(client),
            ttl,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            client: None,
            ttl: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && !self.ttl.is_zero()
    }

    pub fn client(&self) -> Option<&RedisClient> {
        self.client.as_ref()
    }

    /// Cached value for `key`, or `None` on miss or any cache failure
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let client = self.client.as_ref().filter(|_| self.is_enabled())?;

        match try_get(client, &full_key(key)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::trace!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let Some(client) = self.client.as_ref().filter(|_| self.is_enabled()) else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = try_set(client, &full_key(key), &raw, self.ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Returns the cached value, or runs `load` and caches its result
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get_json(key).await {
            return Ok(hit);
        }

        let value = load().await?;
        self.set_json(key, &value).await;
        Ok(value)
    }

    /// Deletes every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let Some(client) = self.client.as_ref() else {
            return;
        };

        match try_invalidate(client, &format!("{}{}*", KEY_PREFIX, prefix)).await {
            Ok(removed) => tracing::debug!(prefix, removed, "Invalidated cache entries"),
            Err(e) => tracing::warn!(prefix, error = %e, "Cache invalidation failed"),
        }
    }
}

fn full_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

async fn try_get(client: &RedisClient, key: &str) -> Result<Option<String>, CacheError> {
    let mut conn = client.connection();
    let raw: Option<String> = tokio::time::timeout(
        client.command_timeout(),
        redis::cmd("GET").arg(key).query_async(&mut conn),
    )
    .await
    .map_err(|_| CacheError::Timeout)??;

    Ok(raw)
}

async fn try_set(
    client: &RedisClient,
    key: &str,
    raw: &str,
    ttl: Duration,
) -> Result<(), CacheError> {
    let mut conn = client.connection();
    let _: () = tokio::time::timeout(
        client.command_timeout(),
        redis::cmd("SET")
            .arg(key)
            .arg(raw)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn),
    )
    .await
    .map_err(|_| CacheError::Timeout)??;

    Ok(())
}

async fn try_invalidate(client: &RedisClient, pattern: &str) -> Result<usize, CacheError> {
    let mut conn = client.connection();

    let mut matched: Vec<String> = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (next, batch): (u64, Vec<String>) = tokio::time::timeout(
            client.command_timeout(),
            redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Timeout)??;

        matched.extend(batch);
        cursor = next;
        if cursor == 0 {
            break;
        }
    }

    if matched.is_empty() {
        return Ok(0);
    }

    let removed: usize = tokio::time::timeout(
        client.command_timeout(),
        redis::cmd("DEL").arg(&matched).query_async(&mut conn),
    )
    .await
    .map_err(|_| CacheError::Timeout)??;

    Ok(removed)
}
