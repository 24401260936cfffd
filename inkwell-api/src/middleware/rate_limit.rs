/// Per-IP rate limiting for public write endpoints
///
/// Anonymous writes (comments, likes, activity, newsletter, registration) are
/// limited with a token bucket kept in Redis, so the limit holds across API
/// instances. Each client IP gets `PUBLIC_WRITES_PER_MINUTE` tokens, refilled
/// continuously.
///
/// # Storage
///
/// Bucket state lives in the hash `inkwell:ratelimit:<ip>` (fields `tokens`,
/// `ts`) and expires after two idle minutes. The refill/consume step runs as
/// one Lua script, so concurrent requests cannot double-spend.
///
/// # Client address
///
/// The socket peer is used unless `TRUST_PROXY_HEADERS` is set. Behind a
/// proxy, the last `X-Forwarded-For` hop is the one the proxy appended, so it
/// is taken over anything the client sent.
///
/// # Failure mode
///
/// Without Redis, or when Redis errors, requests are let through and the
/// failure is logged.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: bucket capacity
/// - `X-RateLimit-Remaining`: tokens left after this request
/// - `Retry-After`: seconds until a token is available (429 only)
///
/// # Example
///
/// ```no_run
/// use axum::{handler::Handler, middleware::from_fn_with_state, routing::post, Router};
/// use inkwell_api::app::AppState;
/// use inkwell_api::middleware::rate_limit::rate_limit_layer;
///
/// # fn example(state: AppState) -> Router<AppState> {
/// async fn handler() {}
///
/// Router::new().route(
///     "/api/likes",
///     post(handler.layer(from_fn_with_state(state, rate_limit_layer))),
/// )
/// # }
/// ```

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use inkwell_shared::cache::{CacheError, RedisClient};

use crate::app::AppState;
use crate::error::ApiError;

/// Idle buckets expire after this many seconds
const BUCKET_TTL_SECS: u64 = 120;

const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_per_ms = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local ttl = tonumber(ARGV[4])

local bucket = redis.call('HMGET', key, 'tokens', 'ts')
local tokens = tonumber(bucket[1])
local ts = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    ts = now
end

local elapsed = math.max(0, now - ts)
tokens = math.min(capacity, tokens + (elapsed * refill_per_ms))

local allowed = 0
if tokens >= 1 then
    tokens = tokens - 1
    allowed = 1
end

redis.call('HSET', key, 'tokens', tostring(tokens), 'ts', tostring(now))
redis.call('EXPIRE', key, ttl)

local retry_after = 0
if allowed == 0 then
    retry_after = math.ceil((1 - tokens) / refill_per_ms / 1000)
end

return {allowed, math.floor(tokens), retry_after}
"#;

fn token_bucket_script() -> &'static redis::Script {
    static SCRIPT: OnceLock<redis::Script> = OnceLock::new();
    SCRIPT.get_or_init(|| redis::Script::new(TOKEN_BUCKET_SCRIPT))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    /// Bucket capacity, which is also the per-minute budget
    pub capacity: u32,

    /// Tokens added per millisecond
    pub refill_per_ms: f64,
}

impl RateLimit {
    pub fn per_minute(requests: u32) -> Self {
        let capacity = requests.max(1);
        Self {
            capacity,
            refill_per_ms: capacity as f64 / 60_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: u64,
}

/// Token bucket check in front of a handler
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(client) = state.cache.client() else {
        return Ok(next.run(request).await);
    };

    let limit = RateLimit::per_minute(state.config.rate_limit.public_writes_per_minute);
    let connect_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(
        request.headers(),
        connect_addr,
        state.config.rate_limit.trust_proxy_headers,
    );

    let decision = match check_bucket(client, &ip, limit).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, client_ip = %ip, "Rate limit check failed, allowing request");
            return Ok(next.run(request).await);
        }
    };

    if !decision.allowed {
        tracing::info!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: decision.retry_after.max(1),
            message: format!(
                "Too many requests. Try again in {} seconds",
                decision.retry_after.max(1)
            ),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.capacity));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));

    Ok(response)
}

/// Client address used as the bucket key
///
/// Proxy headers are consulted only when `trust_proxy` is set; otherwise a
/// client could pick a fresh bucket per request.
pub fn client_ip(
    headers: &HeaderMap,
    connect_addr: Option<SocketAddr>,
    trust_proxy: bool,
) -> String {
    let peer = connect_addr.map(|addr| addr.ip().to_string());
    if !trust_proxy {
        return peer.unwrap_or_else(|| "unknown".to_string());
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or(peer)
        .unwrap_or_else(|| "unknown".to_string())
}

async fn check_bucket(
    client: &RedisClient,
    ip: &str,
    limit: RateLimit,
) -> Result<RateLimitDecision, CacheError> {
    let mut conn = client.connection();
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let mut invocation = token_bucket_script().prepare_invoke();
    invocation
        .key(format!("inkwell:ratelimit:{}", ip))
        .arg(limit.capacity)
        .arg(limit.refill_per_ms)
        .arg(now_ms)
        .arg(BUCKET_TTL_SECS);

    let (allowed, remaining, retry_after): (i64, i64, i64) = tokio::time::timeout(
        client.command_timeout(),
        invocation.invoke_async(&mut conn),
    )
    .await
    .map_err(|_| CacheError::Timeout)??;

    Ok(RateLimitDecision {
        allowed: allowed == 1,
        remaining: remaining.max(0) as u32,
        retry_after: retry_after.max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_minute_refill() {
        let limit = RateLimit::per_minute(30);
        assert_eq!(limit.capacity, 30);
        assert!((limit.refill_per_ms * 60_000.0 - 30.0).abs() < 1e-9);

        assert_eq!(RateLimit::per_minute(0).capacity, 1);
    }

    #[test]
    fn test_client_ip_ignores_headers_without_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let addr: SocketAddr = "192.0.2.10:5555".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(addr), false), "192.0.2.10");
        assert_eq!(client_ip(&headers, None, false), "unknown");
    }

    #[test]
    fn test_client_ip_uses_last_forwarded_hop() {
        // the client forged the first entry; the proxy appended the second
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 203.0.113.7"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(client_ip(&headers, None, true), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, None, true), "198.51.100.2");

        let addr: SocketAddr = "192.0.2.10:5555".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(addr), true), "192.0.2.10");
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_bucket_exhausts() {
        use inkwell_shared::cache::RedisConfig;

        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = RedisClient::connect(RedisConfig::new(url)).await.unwrap();
        let ip = format!("test-{}", uuid::Uuid::new_v4());
        let limit = RateLimit::per_minute(2);

        assert!(check_bucket(&client, &ip, limit).await.unwrap().allowed);
        assert!(check_bucket(&client, &ip, limit).await.unwrap().allowed);

        let denied = check_bucket(&client, &ip, limit).await.unwrap();
        assert!(!denied.allowed);
        assert!(denied.retry_after >= 1);
    }
}
