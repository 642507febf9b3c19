// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the comment widget API.
//!
//! Builds the real router on the in-memory backends and drives it with
//! `tower::util::ServiceExt`, keeping seeding handles to the stores so
//! tests can arrange data and inspect persistence directly.

#![allow(dead_code)]

pub mod generators;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower::util::ServiceExt;

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
    models::{Comment, Site},
    store::{CommentStore, SiteStore},
    validator::Validator,
};

/// The assembled application plus handles into its backends.
pub struct TestApp {
    pub router: Router,
    pub sites: Arc<MemorySiteStore>,
    pub comments: Arc<MemoryCommentStore>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub identity: Arc<MemoryIdentityProvider>,
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Build the application with the given configuration.
pub fn build_app(config: Config) -> TestApp {
    let counter_store = Arc::new(MemoryCounterStore::new());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let sites = Arc::new(MemorySiteStore::new());
    let comments = Arc::new(MemoryCommentStore::new());
    let identity = Arc::new(MemoryIdentityProvider::new());
    let metrics = Arc::new(Metrics::new().expect("metrics registry"));

    let state = Arc::new(AppState {
        cache: Cache::new(Some(kv.clone()), Some(metrics.clone())),
        limiter: RateLimiter::new(Some(counter_store), config.rate_limit.clone()),
        captcha: CaptchaVerifier::new(config.captcha.clone()),
        validator: Validator::new(),
        sites: sites.clone(),
        comments: comments.clone(),
        identity: identity.clone(),
        metrics,
        config,
    });

    TestApp {
        router: router(state),
        sites,
        comments,
        kv,
        identity,
    }
}

/// Build the application with default configuration.
pub fn default_app() -> TestApp {
    build_app(Config::default())
}

impl TestApp {
    /// Seed one site and hand the app back, for one-line test setup.
    pub async fn with_site(self, id: &str, domain: Option<&str>, owner_id: &str) -> Self {
        self.seed_site(id, domain, owner_id).await;
        self
    }

    pub async fn seed_site(&self, id: &str, domain: Option<&str>, owner_id: &str) {
        self.sites
            .create_site(Site {
                id: id.to_string(),
                domain: domain.map(str::to_string),
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed site");
    }

    pub async fn seed_comment(&self, id: &str, site_id: &str, path_id: &str, owner_id: &str) {
        self.comments
            .insert(Comment {
                id: id.to_string(),
                site_id: site_id.to_string(),
                path_id: path_id.to_string(),
                message: "seeded".to_string(),
                author: "Guest".to_string(),
                parent: None,
                timestamp: Utc::now(),
                owner_id: owner_id.to_string(),
            })
            .await
            .expect("seed comment");
    }

    pub async fn register_token(&self, token: &str, uid: &str) {
        self.identity.register(token, uid).await;
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, origin: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn get_authed(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
        origin: Option<&str>,
        ip: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        if let Some(ip) = ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    pub async fn authed_json(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<&serde_json::Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn options(&self, uri: &str, origin: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("OPTIONS").uri(uri);
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }
}
