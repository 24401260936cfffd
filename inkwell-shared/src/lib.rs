//! # Inkwell Shared Library
//!
//! Domain types, persistence and auth primitives behind the Inkwell blog API.
//!
//! ## Module Organization
//!
//! - `models`: database models and their SQL
//! - `db`: connection pool and embedded migrations
//! - `auth`: password hashing, JWT validation, role checks
//! - `threading`: nesting flat comment lists into reply trees
//! - `identity`: anonymous per-device identifiers
//! - `slug`: slugs and CMS keys
//! - `cache`: optional Redis read-through cache

pub mod auth;
pub mod cache;
pub mod db;
pub mod identity;
pub mod models;
pub mod slug;
pub mod threading;

/// Current version of the Inkwell shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
