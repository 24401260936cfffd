/// Middleware and request extractors
///
/// - `auth`: dashboard authentication extractor
/// - `extract`: JSON/path/query extractors with uniform error bodies
/// - `rate_limit`: per-IP token bucket for public writes
/// - `security`: security response headers

pub mod auth;
pub mod extract;
pub mod rate_limit;
pub mod security;
