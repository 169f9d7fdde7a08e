//! Optional bearer-token check for the HTTP endpoints

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use tracing::warn;

/// Whether a request may proceed. An empty `configured_token` disables auth.
pub fn is_authorized(configured_token: &str, headers: &HeaderMap) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    match provided {
        Some(token) => tokens_match(configured_token.as_bytes(), token.as_bytes()),
        None => {
            warn!("Rejected request without a bearer token");
            false
        }
    }
}

/// Token part of an `Authorization: Bearer <token>` value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Length-checked comparison that does not short-circuit on the first
/// differing byte
fn tokens_match(expected: &[u8], provided: &[u8]) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .iter()
        .zip(provided)
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_auth_disabled_without_token() {
        assert!(is_authorized("", &HeaderMap::new()));
        assert!(is_authorized("", &headers_with("Bearer anything")));
    }

    #[test]
    fn test_valid_token() {
        assert!(is_authorized("secret123", &headers_with("Bearer secret123")));
    }

    #[test]
    fn test_wrong_or_missing_token() {
        assert!(!is_authorized("secret123", &headers_with("Bearer wrong")));
        assert!(!is_authorized("secret123", &headers_with("Basic secret123")));
        assert!(!is_authorized("secret123", &HeaderMap::new()));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer  spaced "), Some("spaced"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(b"hello", b"hello"));
        assert!(!tokens_match(b"hello", b"world"));
        assert!(!tokens_match(b"short", b"longer"));
    }
}
