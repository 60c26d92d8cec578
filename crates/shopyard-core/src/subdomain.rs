//! Subdomain parsing, validation, and sanitization.
//!
//! The resolver turns a request `Host` into a tenant subdomain candidate;
//! validation and sanitization guard user-submitted subdomain strings at
//! registration time. The root domain is passed in explicitly from config
//! rather than read from ambient process state.

use regex::Regex;
use std::sync::LazyLock;

const MAX_SUBDOMAIN_LEN: usize = 63;
const MIN_SUBDOMAIN_LEN: usize = 3;

// Leading/trailing alphanumeric, hyphens allowed internally.
static SUBDOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{1,61}[a-z0-9])?$").expect("valid regex"));

/// Extract the tenant subdomain from a request hostname, given the
/// configured root domain (which may carry a port, e.g. `localhost:3000`).
///
/// Returns `None` for the bare root domain, for `www`, and for hosts with
/// no labels beyond the root domain. Local development hosts use a
/// simplified single-label rule (`tenant.localhost`).
pub fn extract_subdomain(hostname: &str, root_domain: &str) -> Option<String> {
    // Strip ports from both sides before comparing labels.
    let clean_hostname = hostname.split(':').next().unwrap_or("");
    let clean_root = root_domain.split(':').next().unwrap_or("");

    if clean_hostname.is_empty() || clean_hostname == clean_root {
        return None;
    }

    // Local development: subdomain.localhost or just localhost.
    if clean_hostname.contains("localhost") {
        let parts: Vec<&str> = clean_hostname.split('.').collect();
        if parts.len() > 1 && parts[0] != "www" {
            return Some(parts[0].to_string());
        }
        return None;
    }

    let hostname_parts: Vec<&str> = clean_hostname.split('.').collect();
    let root_parts: Vec<&str> = clean_root.split('.').collect();

    // Production: the subdomain is whatever labels precede the root domain.
    if hostname_parts.len() > root_parts.len() {
        let subdomain = hostname_parts[..hostname_parts.len() - root_parts.len()].join(".");
        if subdomain == "www" {
            return None;
        }
        return Some(subdomain);
    }

    None
}

/// Validate a user-submitted subdomain: 3-63 characters, lowercase letters,
/// digits, and hyphens, with alphanumeric first and last characters.
pub fn is_valid_subdomain(subdomain: &str) -> bool {
    if subdomain.len() < MIN_SUBDOMAIN_LEN || subdomain.len() > MAX_SUBDOMAIN_LEN {
        return false;
    }
    SUBDOMAIN_RE.is_match(subdomain)
}

/// Normalize arbitrary input into subdomain shape: lowercase, drop
/// disallowed characters, collapse repeated hyphens, trim hyphens at the
/// ends, and truncate to 63 characters. Total and idempotent; the result
/// may still be too short to pass [`is_valid_subdomain`].
pub fn sanitize_subdomain(subdomain: &str) -> String {
    let lowered = subdomain.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut last_was_hyphen = false;
    for c in lowered.chars() {
        match c {
            'a'..='z' | '0'..='9' => {
                out.push(c);
                last_was_hyphen = false;
            }
            '-' => {
                if !last_was_hyphen {
                    out.push('-');
                    last_was_hyphen = true;
                }
            }
            _ => {}
        }
    }

    let trimmed = out.trim_matches('-');
    let truncated = &trimmed[..trimmed.len().min(MAX_SUBDOMAIN_LEN)];
    // Truncation can expose a trailing hyphen; trim again so the function
    // stays idempotent.
    truncated.trim_end_matches('-').to_string()
}

/// Public URL for a tenant subdomain under the configured root domain.
pub fn subdomain_url(subdomain: &str, root_domain: &str, https: bool) -> String {
    let protocol = if https { "https" } else { "http" };
    if root_domain.contains("localhost") {
        let port = root_domain.split(':').nth(1).unwrap_or("3000");
        return format!("{}://{}.localhost:{}", protocol, subdomain, port);
    }
    format!("{}://{}.{}", protocol, subdomain, root_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_label_subdomain() {
        assert_eq!(
            extract_subdomain("app.example.com", "example.com"),
            Some("app".to_string())
        );
    }

    #[test]
    fn www_is_treated_as_root() {
        assert_eq!(extract_subdomain("www.example.com", "example.com"), None);
    }

    #[test]
    fn bare_root_domain_has_no_subdomain() {
        assert_eq!(extract_subdomain("example.com", "example.com"), None);
    }

    #[test]
    fn port_is_stripped_before_comparison() {
        assert_eq!(
            extract_subdomain("shop.example.com:8443", "example.com:8443"),
            Some("shop".to_string())
        );
        assert_eq!(extract_subdomain("example.com:8443", "example.com"), None);
    }

    #[test]
    fn localhost_uses_single_label_rule() {
        assert_eq!(
            extract_subdomain("acme.localhost:3000", "localhost:3000"),
            Some("acme".to_string())
        );
        assert_eq!(extract_subdomain("localhost:3000", "localhost:3000"), None);
        assert_eq!(extract_subdomain("www.localhost", "localhost:3000"), None);
    }

    #[test]
    fn multi_label_subdomains_are_joined() {
        assert_eq!(
            extract_subdomain("a.b.example.com", "example.com"),
            Some("a.b".to_string())
        );
    }

    #[test]
    fn validates_length_bounds() {
        assert!(!is_valid_subdomain("ab"));
        assert!(is_valid_subdomain("abc"));
        assert!(is_valid_subdomain(&"a".repeat(63)));
        assert!(!is_valid_subdomain(&"a".repeat(64)));
    }

    #[test]
    fn validates_character_rules() {
        assert!(is_valid_subdomain("pet-shop-1"));
        assert!(!is_valid_subdomain("-petshop"));
        assert!(!is_valid_subdomain("petshop-"));
        assert!(!is_valid_subdomain("Pet.Shop"));
        assert!(!is_valid_subdomain("pet shop"));
    }

    #[test]
    fn sanitize_normalizes_case_and_characters() {
        assert_eq!(sanitize_subdomain("My Pet Shop!"), "mypetshop");
        assert_eq!(sanitize_subdomain("--acme--"), "acme");
        assert_eq!(sanitize_subdomain("a--b---c"), "a-b-c");
    }

    #[test]
    fn sanitize_truncates_to_63() {
        let long = "x".repeat(100);
        assert_eq!(sanitize_subdomain(&long).len(), 63);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in [
            "My Pet Shop!",
            "--a--b--",
            "ALLCAPS",
            "x-",
            "trailing-hyphen-at-the-truncation-boundary-xxxxxxxxxxxxxxxxxxx-y",
        ] {
            let once = sanitize_subdomain(input);
            assert_eq!(sanitize_subdomain(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn sanitized_output_validates_when_long_enough() {
        for input in ["My Pet Shop!", "--acme--", "A B C D", "shop@home", "ab"] {
            let s = sanitize_subdomain(input);
            if s.len() >= 3 {
                assert!(is_valid_subdomain(&s), "sanitized {:?} -> {:?}", input, s);
            }
        }
    }

    #[test]
    fn subdomain_url_handles_localhost_and_production() {
        assert_eq!(
            subdomain_url("acme", "localhost:3000", false),
            "http://acme.localhost:3000"
        );
        assert_eq!(
            subdomain_url("acme", "example.com", true),
            "https://acme.example.com"
        );
    }
}
