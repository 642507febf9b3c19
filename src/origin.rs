// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Origin verification for the public widget API.
//!
//! The matcher parses the URL's host component and applies
//! suffix-anchored comparison. Raw substring search over the origin
//! string is how spoofed hosts like `notvictim.com.attacker.com` get
//! accepted, so it is never used here.

use axum::http::{header, HeaderMap};
use tracing::debug;
use url::Url;

/// Check whether a browser `Origin` value belongs to a registered domain.
///
/// `origin` must be a full URL (`scheme://host[:port]`); `registered_domain`
/// is a bare hostname, optionally prefixed with `www.`. Returns `false` for
/// anything malformed rather than erroring.
///
/// Accepted hosts, after lowercasing and stripping one `www.` from the
/// registered domain:
/// - the domain itself, or `www.` + domain;
/// - any host ending in `.` + domain whose subdomain part does not embed
///   the domain again across a label boundary (blocks
///   `evil.example.com.example.com` while accepting `blog.example.com`
///   and `admin.api.example.com`).
pub fn origin_matches(origin: &str, registered_domain: &str) -> bool {
    let origin = origin.trim();
    let registered = registered_domain.trim();
    if origin.is_empty() || registered.is_empty() {
        return false;
    }

    let lowered = origin.to_lowercase();
    if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
        return false;
    }

    let host = match Url::parse(&lowered) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_string(),
            None => return false,
        },
        Err(_) => return false,
    };

    let registered = registered.to_lowercase();
    let normalized = registered.strip_prefix("www.").unwrap_or(&registered);

    if host == normalized || host == format!("www.{normalized}") {
        return true;
    }

    if let Some(subdomain) = host.strip_suffix(&format!(".{normalized}")) {
        if !(subdomain.contains('.') && subdomain.contains(normalized)) {
            return true;
        }
    }

    false
}

/// Syntactic screening of the `Origin` header.
///
/// A missing, non-UTF-8, over-length, or non-http(s) value degrades to
/// `None` instead of failing the request; whether an absent origin is
/// acceptable is decided later, against the looked-up site.
pub fn screen_origin_header(headers: &HeaderMap, max_len: usize) -> Option<String> {
    let raw = headers.get(header::ORIGIN)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > max_len {
        debug!(len = raw.len(), "discarding empty or over-length origin header");
        return None;
    }
    let lowered = raw.to_lowercase();
    if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
        debug!(origin = %raw, "discarding origin without http(s) scheme");
        return None;
    }
    Some(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn exact_match_and_www_variants() {
        assert!(origin_matches("https://example.com", "example.com"));
        assert!(origin_matches("http://example.com", "example.com"));
        assert!(origin_matches("https://www.example.com", "example.com"));
        assert!(origin_matches("https://example.com", "www.example.com"));
        assert!(origin_matches("https://www.example.com", "www.example.com"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(origin_matches("https://EXAMPLE.COM", "example.com"));
        assert!(origin_matches("https://example.com", "EXAMPLE.COM"));
    }

    #[test]
    fn ports_and_paths_do_not_affect_the_host() {
        assert!(origin_matches("https://example.com:8443", "example.com"));
        assert!(origin_matches("https://blog.example.com/post/1", "example.com"));
    }

    #[test]
    fn subdomains_match() {
        assert!(origin_matches("https://blog.example.com", "example.com"));
        assert!(origin_matches("https://api.example.com", "example.com"));
        assert!(origin_matches("https://admin.api.example.com", "example.com"));
        // Suffix-anchored rule: the host ends in `.example.com` and the
        // subdomain part carries no second copy of the domain.
        assert!(origin_matches("https://attacker.com.example.com", "example.com"));
    }

    #[test]
    fn spoofed_hosts_are_rejected() {
        assert!(!origin_matches("https://attacker-example.com", "example.com"));
        assert!(!origin_matches("https://example.com-attacker.com", "example.com"));
        assert!(!origin_matches("https://example.com.attacker.com", "example.com"));
        assert!(!origin_matches("https://notexample.com", "example.com"));
        assert!(!origin_matches("https://evil.example.com.example.com", "example.com"));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(!origin_matches("", "example.com"));
        assert!(!origin_matches("https://example.com", ""));
        assert!(!origin_matches("   ", "example.com"));
        assert!(!origin_matches("example.com", "example.com"));
        assert!(!origin_matches("ftp://example.com", "example.com"));
        assert!(!origin_matches("javascript:alert(1)", "example.com"));
        assert!(!origin_matches("https://", "example.com"));
    }

    #[test]
    fn screening_accepts_a_plain_origin() {
        let mut headers = HeaderMap::new();
        headers.insert("origin", HeaderValue::from_static("https://blog.example.com"));
        assert_eq!(
            screen_origin_header(&headers, 2048).as_deref(),
            Some("https://blog.example.com")
        );
    }

    #[test]
    fn screening_degrades_to_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(screen_origin_header(&headers, 2048), None);

        headers.insert("origin", HeaderValue::from_static("null"));
        assert_eq!(screen_origin_header(&headers, 2048), None);

        let oversized = format!("https://{}.example.com", "a".repeat(100));
        headers.insert("origin", HeaderValue::from_str(&oversized).unwrap());
        assert_eq!(screen_origin_header(&headers, 64), None);
    }
}
