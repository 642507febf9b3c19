// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for the widget and dashboard endpoints.
//!
//! Counts live in an injected [`CounterStore`] so several processes can
//! share one quota. Each `(class, identifier)` pair gets a weighted
//! two-bucket sliding window: the previous window's count decays
//! continuously as the current one fills, so quotas never reset in
//! bursts at window boundaries.
//!
//! Availability beats strict enforcement here: with no counter store
//! configured, or a store that errors, `admit` fails open.

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Endpoint classes with independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateClass {
    /// Public comment submission (strictest tier).
    Comment,
    /// Public thread fetch.
    Thread,
    /// Authenticated dashboard traffic (loosest tier).
    Api,
}

impl RateClass {
    pub fn key_prefix(self) -> &'static str {
        match self {
            RateClass::Comment => "comment",
            RateClass::Thread => "thread",
            RateClass::Api => "api",
        }
    }
}

impl std::fmt::Display for RateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// Counter store error.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter store error: {0}")]
    Backend(String),
}

/// Shared counter service the sliding window runs on.
///
/// The contract mirrors Redis `INCR` + `EXPIRE`/`GET`: `incr` creates the
/// counter with the given TTL when absent and must be atomic per key.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, CounterError>;
    async fn get(&self, key: &str) -> Result<u64, CounterError>;
}

/// Result of an admission check.
#[derive(Debug, Clone)]
pub enum RateDecision {
    /// Request is within quota.
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    /// Quota exhausted for this identifier.
    Limited {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after: Duration,
    },
    /// No counter store available; the request passes unmetered.
    Unenforced,
}

impl RateDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateDecision::Limited { .. })
    }
}

/// Sliding-window rate limiter over a shared counter store.
pub struct RateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter. Passing `None` for the store disables
    /// enforcement entirely (every check returns `Unenforced`).
    pub fn new(store: Option<Arc<dyn CounterStore>>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Check and consume quota for one request.
    pub async fn admit(&self, class: RateClass, identifier: &str) -> RateDecision {
        let Some(store) = &self.store else {
            return RateDecision::Unenforced;
        };

        let rule = self.config.rule(class);
        let window_ms = (rule.window_secs * 1000) as i64;
        let now_ms = Utc::now().timestamp_millis();
        let slot = now_ms.div_euclid(window_ms);
        let elapsed = (now_ms - slot * window_ms) as f64 / window_ms as f64;

        let current_key = format!("ratelimit:{}:{}:{}", class.key_prefix(), identifier, slot);
        let previous_key = format!("ratelimit:{}:{}:{}", class.key_prefix(), identifier, slot - 1);

        // Counters outlive two windows so the previous bucket stays
        // readable for the whole of the current one.
        let ttl = Duration::from_secs(rule.window_secs * 2);

        let current = match store.incr(&current_key, ttl).await {
            Ok(count) => count,
            Err(e) => {
                warn!(%class, identifier, error = %e, "counter store unavailable, failing open");
                return RateDecision::Unenforced;
            }
        };
        let previous = match store.get(&previous_key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(%class, identifier, error = %e, "counter store unavailable, failing open");
                return RateDecision::Unenforced;
            }
        };

        let weighted = previous as f64 * (1.0 - elapsed) + current as f64;
        let reset_at = Utc
            .timestamp_millis_opt((slot + 1) * window_ms)
            .single()
            .unwrap_or_else(Utc::now);

        if weighted > rule.limit as f64 {
            let retry_after = Duration::from_millis(((slot + 1) * window_ms - now_ms).max(0) as u64);
            debug!(%class, identifier, weighted, limit = rule.limit, "rate limit exceeded");
            RateDecision::Limited {
                limit: rule.limit,
                reset_at,
                retry_after,
            }
        } else {
            let remaining = (rule.limit as f64 - weighted).floor().max(0.0) as u32;
            RateDecision::Allowed {
                limit: rule.limit,
                remaining,
                reset_at,
            }
        }
    }
}

/// Derive the rate-limit identifier for a request.
///
/// First address in the forwarded-for chain, else a shared anonymous
/// bucket; the limiter keeps working when no IP is determinable.
pub fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}
