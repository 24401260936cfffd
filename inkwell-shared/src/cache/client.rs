/// Redis connection wrapper
///
/// Wraps a [`ConnectionManager`], which reconnects on its own after a dropped
/// connection. Cloning is cheap: every clone shares the same underlying
/// multiplexed connection.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use serde::Serialize;

use super::CacheError;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,

    /// Upper bound for a single command, after which callers give up
    pub command_timeout: Duration,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            command_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl RedisClient {
    /// Opens the connection manager and verifies the server answers
    pub async fn connect(config: RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Config(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %sanitize_url(&config.url), "Connected to Redis");

        Ok(Self {
            manager,
            config: Arc::new(config),
        })
    }

    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn command_timeout(&self) -> Duration {
        self.config.command_timeout
    }

    pub async fn ping(&self) -> Result<bool, CacheError> {
        let mut conn = self.connection();

        let result: Result<String, RedisError> = tokio::time::timeout(
            self.config.command_timeout,
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Timeout)?;

        match result {
            Ok(pong) => Ok(pong == "PONG"),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stats(&self) -> RedisStats {
        RedisStats {
            healthy: self.ping().await.unwrap_or(false),
            url: sanitize_url(&self.config.url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedisStats {
    pub healthy: bool,
    pub url: String,
}

/// Masks credentials in a Redis URL for logging
pub fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > scheme_end {
            return format!("{}***@{}", &url[..scheme_end + 3], &url[at_pos + 1..]);
        }
    }
    url.to_string()
}
