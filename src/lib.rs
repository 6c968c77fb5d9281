//! Hoplink - redirect resolution and analytics core for a URL shortener
//!
//! This library implements the hot path of a link-shortening service:
//! given a short code, decide within milliseconds whether and where to
//! redirect a visitor, while recording the visit off the response path.
//!
//! # Architecture
//! - `cache`: cache-aside read layer over the link store (Redis / moka)
//! - `limiter`: sliding-window rate limiting keyed by (operation, caller)
//! - `analytics`: visit queue + batch aggregator into daily rollups
//! - `resolver`: the per-request state machine composing the above
//! - `storage`: SeaORM backend (SQLite / MySQL / PostgreSQL)
//! - `api`: actix-web endpoints (redirect, password verification)
//! - `services`: the CRUD write layer honoring cache invalidation
//! - `config`: TOML + environment configuration

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod logging;
pub mod resolver;
pub mod services;
pub mod storage;
pub mod utils;
