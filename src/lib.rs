// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment Widget API
//!
//! Embeddable comment service: third-party websites register a site
//! (domain + owner) and embed a widget that reads and writes comments
//! through this crate's public API. Every public request passes the
//! admission path before touching storage:
//!
//! - Origin verification against the registered domain (anti-spoofing)
//! - Per-IP sliding-window rate limiting
//! - Payload validation and normalization
//! - Optional captcha verification (fail-closed)
//! - Read-through caching with invalidation cascades on writes
//!
//! The relational store, identity provider, cache store, and counter
//! store are injected trait objects; the bundled in-memory backends run
//! the service self-contained.

pub mod cache;
pub mod captcha;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod origin;
pub mod store;
pub mod validator;

pub use cache::Cache;
pub use config::Config;
pub use cors::EndpointClass;
pub use error::ApiError;
pub use limiter::{RateClass, RateDecision, RateLimiter};
pub use validator::Validator;
