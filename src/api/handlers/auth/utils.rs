//! Small helpers shared by the auth handlers.

use axum::http::HeaderMap;
use regex::Regex;

const MAX_EMAIL_CHARS: usize = 255;
const MIN_USERNAME_CHARS: usize = 1;
const MAX_USERNAME_CHARS: usize = 100;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 200;

/// Lowercases and trims an email so lookups and uniqueness checks are
/// case-insensitive.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Light-weight email shape check, not an RFC 5321 validator.
pub(crate) fn valid_email(email: &str) -> bool {
    if email.chars().count() > MAX_EMAIL_CHARS {
        return false;
    }

    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub(crate) fn valid_username(username: &str) -> bool {
    let chars = username.chars().count();

    (MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&chars)
}

pub(crate) fn valid_password(password: &str) -> bool {
    let chars = password.chars().count();

    (MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&chars)
}

/// Client IP for rate limiting, taken from `X-Forwarded-For` (first hop) or
/// `X-Real-IP`. Returns `None` when neither header carries a usable value.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Correlation id assigned by the request-id layer, `none` when absent.
pub(crate) fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert_eq!(normalize_email("plain@example.com"), "plain@example.com");
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("ana@example.com"));
        assert!(valid_email("a.b+c@sub.example.org"));

        assert!(!valid_email(""));
        assert!(!valid_email("no-at-sign"));
        assert!(!valid_email("two@@example.com"));
        assert!(!valid_email("spaces in@example.com"));
        assert!(!valid_email("missing@tld"));
    }

    #[test]
    fn test_valid_email_rejects_oversized() {
        let local = "a".repeat(250);
        let email = format!("{local}@example.com");

        assert!(!valid_email(&email));
    }

    #[test]
    fn test_valid_username_bounds() {
        assert!(valid_username("a"));
        assert!(valid_username(&"u".repeat(100)));

        assert!(!valid_username(""));
        assert!(!valid_username(&"u".repeat(101)));
    }

    #[test]
    fn test_valid_password_bounds() {
        assert!(valid_password("12345678"));
        assert!(valid_password(&"p".repeat(200)));

        assert!(!valid_password("1234567"));
        assert!(!valid_password(&"p".repeat(201)));
    }

    #[test]
    fn test_extract_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(extract_client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(extract_client_ip(&headers), Some("198.51.100.2".to_string()));
    }

    #[test]
    fn test_extract_client_ip_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));

        assert_eq!(extract_client_ip(&headers), None);
    }

    #[test]
    fn test_request_id_defaults_to_none() {
        let headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "none");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-request-id",
            HeaderValue::from_static("01JGME0Z8K3T5M4N6P7Q8R9S0T"),
        );
        assert_eq!(request_id(&headers), "01JGME0Z8K3T5M4N6P7Q8R9S0T");
    }
}
