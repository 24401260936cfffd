//! # Inkwell API Server Library
//!
//! Router, handlers and HTTP plumbing of the Inkwell blog API. The binary in
//! `main.rs` only wires configuration, the pool and the cache into
//! [`app::build_router`].
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Auth extractor, request extractors, rate limiting, security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
