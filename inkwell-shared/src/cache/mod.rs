/// Optional Redis layer
///
/// - [`client`]: connection management
/// - [`response_cache`]: read-through JSON cache for public reads
/// - [`keys`]: cache key layout
///
/// Redis is optional. Without `REDIS_URL` the API runs with
/// [`ResponseCache::disabled`] and hits the database for every read.

use redis::RedisError;
use thiserror::Error;

pub mod client;
pub mod response_cache;

pub use client::{RedisClient, RedisConfig};
pub use response_cache::ResponseCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Redis configuration error: {0}")]
    Config(String),

    #[error("Redis command timed out")]
    Timeout,
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

/// Cache key layout, relative to [`response_cache::KEY_PREFIX`]
pub mod keys {
    use sha2::{Digest, Sha256};

    pub const POSTS_PREFIX: &str = "posts:";
    pub const CATEGORIES_PREFIX: &str = "categories:";
    pub const SITE_CONTENT_PREFIX: &str = "site-content:";

    /// One page of the public post list; `query` is any stable rendering of the filters
    pub fn post_list(query: &str) -> String {
        let digest = hex::encode(Sha256::digest(query.as_bytes()));
        format!("{}list:{}", POSTS_PREFIX, &digest[..32])
    }

    pub fn post_by_slug(slug: &str) -> String {
        format!("{}slug:{}", POSTS_PREFIX, slug)
    }

    pub fn active_categories() -> String {
        format!("{}active", CATEGORIES_PREFIX)
    }

    pub fn site_content_page(page_key: &str) -> String {
        format!("{}{}", SITE_CONTENT_PREFIX, page_key)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_keys_share_invalidation_prefixes() {
            assert!(post_list("limit=20").starts_with(POSTS_PREFIX));
            assert!(post_by_slug("hello").starts_with(POSTS_PREFIX));
            assert!(active_categories().starts_with(CATEGORIES_PREFIX));
            assert_eq!(site_content_page("home"), "site-content:home");
        }

        #[test]
        fn test_post_list_key_depends_on_query() {
            assert_eq!(post_list("a"), post_list("a"));
            assert_ne!(post_list("limit=20"), post_list("limit=21"));
        }
    }
}
