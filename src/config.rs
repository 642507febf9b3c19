// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the comment widget API.
//!
//! Defaults keep a local development instance usable without any
//! environment: rate limiting and caching run against the in-memory
//! backends, captcha verification is disabled until a secret is set,
//! and missing-origin writes are only rejected in production mode.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::limiter::RateClass;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Run mode controlling the missing-origin policy on public writes
    #[serde(default)]
    pub mode: Mode,

    /// Longest Origin header value accepted before it is treated as absent
    #[serde(default = "default_max_origin_len")]
    pub max_origin_header_len: usize,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Cache TTL configuration
    #[serde(default)]
    pub cache_ttl: CacheTtlConfig,

    /// Captcha oracle configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// CORS configuration for the authenticated dashboard API
    #[serde(default)]
    pub cors: CorsConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Development
    }
}

/// One sliding-window rule: `limit` requests per `window_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateRule {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateRule {
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Per-endpoint-class rate limits.
///
/// The write path is the strictest tier, public reads sit in the
/// middle, and authenticated dashboard traffic gets the loosest one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Comment submission (default: 5 per minute per IP)
    #[serde(default = "default_comment_rule")]
    pub comment: RateRule,

    /// Thread fetch (default: 30 per minute per IP)
    #[serde(default = "default_thread_rule")]
    pub thread: RateRule,

    /// Authenticated dashboard API (default: 100 per minute per user)
    #[serde(default = "default_api_rule")]
    pub api: RateRule,
}

impl RateLimitConfig {
    /// Rule for a given endpoint class.
    pub fn rule(&self, class: RateClass) -> RateRule {
        match class {
            RateClass::Comment => self.comment,
            RateClass::Thread => self.thread,
            RateClass::Api => self.api,
        }
    }
}

/// Cache TTLs per key family, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    /// Thread and owner comment-list entries (default: 30 days)
    #[serde(default = "default_ttl_secs")]
    pub comments_secs: u64,

    /// Site records (default: 30 days)
    #[serde(default = "default_ttl_secs")]
    pub site_secs: u64,

    /// Owner stats (default: 30 days)
    #[serde(default = "default_ttl_secs")]
    pub stats_secs: u64,
}

impl CacheTtlConfig {
    pub fn comments(&self) -> Duration {
        Duration::from_secs(self.comments_secs)
    }

    pub fn site(&self) -> Duration {
        Duration::from_secs(self.site_secs)
    }

    pub fn stats(&self) -> Duration {
        Duration::from_secs(self.stats_secs)
    }
}

/// Captcha oracle configuration.
///
/// With no secret configured the check is a pass-through, which keeps
/// local instances usable without a captcha account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default)]
    pub secret: Option<String>,

    /// Verification endpoint (default: Cloudflare Turnstile siteverify)
    #[serde(default = "default_captcha_verify_url")]
    pub verify_url: String,
}

/// CORS configuration for the authenticated dashboard API.
///
/// The public widget API reflects registered-site origins per request
/// and is not configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins allowed to call the dashboard API with credentials
    #[serde(default = "default_dashboard_origins")]
    pub dashboard_origins: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_origin_len() -> usize {
    2048
}

fn default_comment_rule() -> RateRule {
    RateRule { limit: 5, window_secs: 60 }
}

fn default_thread_rule() -> RateRule {
    RateRule { limit: 30, window_secs: 60 }
}

fn default_api_rule() -> RateRule {
    RateRule { limit: 100, window_secs: 60 }
}

fn default_ttl_secs() -> u64 {
    2_592_000 // 30 days
}

fn default_captcha_verify_url() -> String {
    "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string()
}

fn default_dashboard_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "https://localhost:3000".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            mode: Mode::default(),
            max_origin_header_len: default_max_origin_len(),
            rate_limit: RateLimitConfig::default(),
            cache_ttl: CacheTtlConfig::default(),
            captcha: CaptchaConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            comment: default_comment_rule(),
            thread: default_thread_rule(),
            api: default_api_rule(),
        }
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            comments_secs: default_ttl_secs(),
            site_secs: default_ttl_secs(),
            stats_secs: default_ttl_secs(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verify_url: default_captcha_verify_url(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            dashboard_origins: default_dashboard_origins(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config {
            bind_addr: env_or("BIND_ADDR", default_bind_addr()),
            mode: match std::env::var("APP_ENV").ok().as_deref() {
                Some("production") => Mode::Production,
                _ => Mode::Development,
            },
            ..Default::default()
        };

        config.rate_limit.comment.limit = env_parse("COMMENT_RATE_LIMIT", config.rate_limit.comment.limit);
        config.rate_limit.thread.limit = env_parse("THREAD_RATE_LIMIT", config.rate_limit.thread.limit);
        config.rate_limit.api.limit = env_parse("API_RATE_LIMIT", config.rate_limit.api.limit);
        config.cache_ttl.comments_secs = env_parse("CACHE_TTL_SECS", config.cache_ttl.comments_secs);
        config.cache_ttl.site_secs = env_parse("CACHE_TTL_SECS", config.cache_ttl.site_secs);
        config.cache_ttl.stats_secs = env_parse("CACHE_TTL_SECS", config.cache_ttl.stats_secs);
        config.captcha.secret = std::env::var("CAPTCHA_SECRET").ok().filter(|s| !s.is_empty());
        config.captcha.verify_url = env_or("CAPTCHA_VERIFY_URL", config.captcha.verify_url);
        config.metrics.enabled = env_parse("METRICS_ENABLED", config.metrics.enabled);

        // The deployed dashboard origin joins the local development ones.
        if let Ok(app_url) = std::env::var("APP_URL") {
            if !app_url.is_empty() && !config.cors.dashboard_origins.contains(&app_url) {
                config.cors.dashboard_origins.push(app_url);
            }
        }

        config
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_write_tier_strictest() {
        let config = Config::default();
        assert!(config.rate_limit.comment.limit < config.rate_limit.thread.limit);
        assert!(config.rate_limit.thread.limit < config.rate_limit.api.limit);
    }

    #[test]
    fn default_mode_is_development() {
        assert!(!Config::default().mode.is_production());
    }
}
