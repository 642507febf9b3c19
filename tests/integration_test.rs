// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Integration tests for the admission-path components working together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use comment_widget_api::{
    cache::{keys, Cache},
    config::{RateLimitConfig, RateRule},
    limiter::{RateClass, RateDecision, RateLimiter},
    memory::{MemoryCounterStore, MemoryKeyValueStore},
    models::CommentPayload,
    origin::origin_matches,
    validator::Validator,
};

#[tokio::test]
async fn validated_comment_for_a_matching_origin_passes_the_full_path() {
    let limiter = RateLimiter::new(
        Some(Arc::new(MemoryCounterStore::new())),
        RateLimitConfig::default(),
    );
    let validator = Validator::new();

    let payload = CommentPayload {
        site_name: Some("s1".to_string()),
        path_name: Some("/blog/post".to_string()),
        message: Some("hello".to_string()),
        author: Some("Bob".to_string()),
        ..CommentPayload::default()
    };

    let input = validator.validate_comment(&payload).expect("valid payload");
    assert!(origin_matches("https://blog.s1.com", "s1.com"));

    let decision = limiter.admit(RateClass::Comment, "203.0.113.7").await;
    assert!(!decision.is_limited());
    assert_eq!(input.author, "Bob");
}

#[tokio::test]
async fn limiter_blocks_the_flood_and_recovers_after_the_window() {
    let config = RateLimitConfig {
        comment: RateRule { limit: 3, window_secs: 1 },
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(Some(Arc::new(MemoryCounterStore::new())), config);

    for i in 0..3 {
        let decision = limiter.admit(RateClass::Comment, "203.0.113.7").await;
        assert!(!decision.is_limited(), "request {} should pass", i + 1);
    }
    assert!(limiter.admit(RateClass::Comment, "203.0.113.7").await.is_limited());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(!limiter.admit(RateClass::Comment, "203.0.113.7").await.is_limited());
}

#[tokio::test]
async fn limiter_reports_retry_metadata_when_limited() {
    let config = RateLimitConfig {
        thread: RateRule { limit: 1, window_secs: 60 },
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(Some(Arc::new(MemoryCounterStore::new())), config);

    limiter.admit(RateClass::Thread, "203.0.113.7").await;
    match limiter.admit(RateClass::Thread, "203.0.113.7").await {
        RateDecision::Limited { limit, retry_after, .. } => {
            assert_eq!(limit, 1);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected Limited, got {other:?}"),
    }
}

#[tokio::test]
async fn cache_computes_once_and_recomputes_after_thread_invalidation() {
    let cache = Cache::new(Some(Arc::new(MemoryKeyValueStore::new())), None);
    let calls = AtomicUsize::new(0);
    let key = keys::thread("s1", "/blog/post");
    let ttl = Duration::from_secs(60);

    for _ in 0..3 {
        let value: Vec<String> = cache
            .get_or_compute(&key, ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["hello".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(value.len(), 1);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate(&key).await;

    let _: Vec<String> = cache
        .get_or_compute(&key, ttl, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn owner_scoped_pattern_invalidation_spares_other_owners() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let cache = Cache::new(Some(store.clone()), None);
    let ttl = Duration::from_secs(60);

    let mine = [keys::comments_list("u1", None), keys::comments_list("u1", Some("s1"))];
    let theirs = keys::comments_list("u2", None);

    for key in mine.iter().chain(std::iter::once(&theirs)) {
        let _: u64 = cache.get_or_compute(key, ttl, || async { Ok(1) }).await.unwrap();
    }

    cache.invalidate_pattern("comments:list:u1:*").await;

    use comment_widget_api::cache::KeyValueStore;
    for key in &mine {
        assert_eq!(store.get(key).await.unwrap(), None);
    }
    assert!(store.get(&theirs).await.unwrap().is_some());
}

#[tokio::test]
async fn key_builders_are_deterministic() {
    assert_eq!(keys::thread("s1", "/blog/post"), "comments:s1:/blog/post");
    assert_eq!(keys::comments_list("u1", None), "comments:list:u1:all");
    assert_eq!(keys::comments_list("u1", Some("s1")), "comments:list:u1:s1");
    assert_eq!(keys::site("s1"), "site:s1");
    assert_eq!(keys::sites_list("u1"), "sites:list:u1");
    assert_eq!(keys::stats("u1"), "stats:u1");
}
