/// Configuration management for the API server
///
/// Everything comes from environment variables (a `.env` file is loaded first
/// when present).
///
/// # Environment Variables
///
/// | Variable | Default |
/// |---|---|
/// | `API_HOST` | `0.0.0.0` |
/// | `API_PORT` | `8080` |
/// | `APP_ENV` | `development` (`production` enables HSTS and hides error detail) |
/// | `CORS_ORIGINS` | `*` (comma separated list) |
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | `10` |
/// | `JWT_SECRET` | required, at least 32 characters |
/// | `REDIS_URL` | unset (cache and rate limiting disabled) |
/// | `CACHE_TTL_SECS` | `300` |
/// | `COMMENT_DEFAULT_STATUS` | `approved` |
/// | `PUBLIC_WRITES_PER_MINUTE` | `30` |
/// | `TRUST_PROXY_HEADERS` | `false` (set when behind a reverse proxy) |
///
/// # Example
///
/// ```no_run
/// use inkwell_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;
use inkwell_shared::models::comment::CommentStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub cache: CacheConfig,
    pub comments: CommentConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed browser origins; `*` means any
    pub cors_origins: Vec<String>,

    /// `APP_ENV=production`
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HS256 secret. Generate with `openssl rand -hex 32`.
    #[serde(skip_serializing)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentConfig {
    /// Status given to newly submitted comments
    pub default_status: CommentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Per-IP budget for public write endpoints
    pub public_writes_per_minute: u32,

    /// Take the client IP from `X-Forwarded-For`/`X-Real-IP` instead of the
    /// socket peer. Only safe when a proxy overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(var("API_PORT"), "API_PORT", 8080u16)?;

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10u32)?;
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let ttl_secs = parse_or(var("CACHE_TTL_SECS"), "CACHE_TTL_SECS", 300u64)?;

        let default_status = match var("COMMENT_DEFAULT_STATUS") {
            Some(raw) => CommentStatus::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("COMMENT_DEFAULT_STATUS: {}", e))?,
            None => CommentStatus::Approved,
        };

        let public_writes_per_minute =
            parse_or(var("PUBLIC_WRITES_PER_MINUTE"), "PUBLIC_WRITES_PER_MINUTE", 30u32)?;
        let trust_proxy_headers =
            parse_or(var("TRUST_PROXY_HEADERS"), "TRUST_PROXY_HEADERS", false)?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            cache: CacheConfig {
                redis_url: var("REDIS_URL"),
                ttl_secs,
            },
            comments: CommentConfig { default_status },
            rate_limit: RateLimitConfig {
                public_writes_per_minute,
                trust_proxy_headers,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value '{}'", key, value)),
        None => Ok(default),
    }
}
