// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the admission path.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counter registry shared through the application state.
pub struct Metrics {
    registry: Registry,
    /// Requests by endpoint and response status.
    pub requests: IntCounterVec,
    /// Rejections by rate-limit class.
    pub rate_limited: IntCounterVec,
    /// Cache lookups by result (`hit` / `miss`).
    pub cache: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Requests by endpoint and status"),
            &["endpoint", "status"],
        )?;
        let rate_limited = IntCounterVec::new(
            Opts::new("rate_limited_total", "Rate-limited requests by class"),
            &["class"],
        )?;
        let cache = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Cache lookups by result"),
            &["result"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;
        registry.register(Box::new(cache.clone()))?;

        Ok(Self {
            registry,
            requests,
            rate_limited,
            cache,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_rendered_output() {
        let metrics = Metrics::new().unwrap();
        metrics
            .requests
            .with_label_values(&["/api/thread", "200"])
            .inc();
        metrics.cache.with_label_values(&["miss"]).inc();

        let rendered = metrics.render();
        assert!(rendered.contains("requests_total"));
        assert!(rendered.contains("cache_lookups_total"));
    }
}
