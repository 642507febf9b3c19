// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for the security suite.

/// Origins that legitimately belong to the registered domain.
pub fn allowed_origins(domain: &str) -> Vec<String> {
    vec![
        format!("https://{domain}"),
        format!("http://{domain}"),
        format!("https://www.{domain}"),
        format!("https://blog.{domain}"),
        format!("https://{domain}:8443"),
        format!("https://{}", domain.to_uppercase()),
    ]
}

/// Spoofed or malformed origins that must never authorize against the
/// registered domain.
pub fn spoofed_origins(domain: &str) -> Vec<String> {
    vec![
        format!("https://attacker-{domain}"),
        format!("https://{domain}-attacker.com"),
        format!("https://{domain}.attacker.com"),
        format!("https://not{domain}"),
        format!("https://evil.{domain}.{domain}"),
        format!("ftp://{domain}"),
        "javascript:alert(1)".to_string(),
        "https://".to_string(),
        domain.to_string(),
        "https://unrelated.example.org".to_string(),
    ]
}

/// A pool of client addresses in the 10.x.x.x range.
pub fn client_ips(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xFF, (i >> 8) & 0xFF, i & 0xFF))
        .collect()
}
