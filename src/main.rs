// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment Widget API server.
//!
//! Assembles the admission path against the in-memory backends and
//! serves the public widget and authenticated dashboard endpoints.
//!
//! ## Configuration
//!
//! Loaded from environment variables (`.env` supported):
//!
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:8080)
//! - `APP_ENV`: `development` or `production` (controls the
//!   missing-origin policy on public writes)
//! - `APP_URL`: deployed dashboard origin added to the CORS allow-list
//! - `CAPTCHA_SECRET`: enables captcha verification when set
//! - `COMMENT_RATE_LIMIT` / `THREAD_RATE_LIMIT` / `API_RATE_LIMIT`
//! - `CACHE_TTL_SECS`, `METRICS_ENABLED`
//! - `ADMIN_TOKEN` / `ADMIN_UID`: register one dashboard bearer token

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comment_widget_api::{
    cache::Cache,
    captcha::CaptchaVerifier,
    config::Config,
    handlers::{router, AppState},
    limiter::RateLimiter,
    memory::{
        MemoryCommentStore, MemoryCounterStore, MemoryIdentityProvider, MemoryKeyValueStore,
        MemorySiteStore,
    },
    metrics::Metrics,
    validator::Validator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        mode = ?config.mode,
        comment_limit = config.rate_limit.comment.limit,
        thread_limit = config.rate_limit.thread.limit,
        api_limit = config.rate_limit.api.limit,
        captcha = config.captcha.secret.is_some(),
        "Starting comment widget API"
    );

    // In-memory backends; swap these for shared services in a
    // multi-process deployment.
    let counter_store = Arc::new(MemoryCounterStore::new());
    let kv_store = Arc::new(MemoryKeyValueStore::new());
    let site_store = Arc::new(MemorySiteStore::new());
    let comment_store = Arc::new(MemoryCommentStore::new());
    let identity = Arc::new(MemoryIdentityProvider::new());

    match (std::env::var("ADMIN_TOKEN"), std::env::var("ADMIN_UID")) {
        (Ok(token), Ok(uid)) if !token.is_empty() && !uid.is_empty() => {
            identity.register(&token, &uid).await;
            info!(uid = %uid, "registered dashboard token from environment");
        }
        _ => warn!("no dashboard token configured; dashboard endpoints will answer 401"),
    }

    let metrics = Arc::new(Metrics::new()?);
    let cache = Cache::new(Some(kv_store.clone()), Some(metrics.clone()));
    let limiter = RateLimiter::new(Some(counter_store.clone()), config.rate_limit.clone());
    let captcha = CaptchaVerifier::new(config.captcha.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        cache,
        limiter,
        captcha,
        validator: Validator::new(),
        sites: site_store,
        comments: comment_store,
        identity,
        metrics,
    });

    // Sweep expired counters and cache entries.
    let sweep_counters = counter_store.clone();
    let sweep_kv = kv_store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweep_counters.cleanup().await;
            sweep_kv.cleanup().await;
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
