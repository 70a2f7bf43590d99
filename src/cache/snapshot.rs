//! Request descriptors and buffered response snapshots
//!
//! A `RequestDescriptor` identifies an outgoing request and is the argument
//! re-issued on every real fetch. A `ResponseSnapshot` is the fully buffered
//! response that gets served to callers and persisted in the store.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use sha2::{Digest, Sha256};
use url::Url;

/// Identity of an outgoing network request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: Url,
    /// Request headers, passed through to the network but ignored for keying
    pub headers: Vec<(String, String)>,
    /// Optional request body, ignored for keying
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Creates a descriptor for the given method and URL with no headers or body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET descriptor
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parses `url` and creates a GET descriptor
    pub fn parse_get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::get(Url::parse(url)?))
    }

    /// Adds a header, returning the updated descriptor
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body, returning the updated descriptor
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The key this request is stored under.
    ///
    /// Only the method and URL take part, so two requests that differ only in
    /// headers or body share one entry.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!("{} {}", self.method, self.url))
    }
}

/// Store key derived from a request's method and URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the key, safe to use as a file name
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.0.as_bytes())
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable, fully buffered capture of a response
///
/// The body is an immutable shared buffer, so cloning a snapshot hands out an
/// independent reader of the same content rather than a second handle to a
/// single-read stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// Final URL of the response
    pub url: Url,
    /// Response status code
    pub status: StatusCode,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Buffered body bytes
    pub body: Bytes,
    /// When the response was received from the network
    pub fetched_at: DateTime<Utc>,
}

impl ResponseSnapshot {
    /// Creates a snapshot with no headers, stamped with the current time
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            headers: Vec::new(),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Whether the response is a success (2xx); only these are ever cached
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Looks up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cache_key_ignores_headers_and_body() {
        let plain = RequestDescriptor::get(url("https://example.com/a"));
        let decorated = RequestDescriptor::get(url("https://example.com/a"))
            .with_header("Accept", "application/json")
            .with_body("payload");

        assert_eq!(plain.cache_key(), decorated.cache_key());
        assert_ne!(plain, decorated);
    }

    #[test]
    fn test_cache_key_distinguishes_method_and_url() {
        let get = RequestDescriptor::get(url("https://example.com/a"));
        let post = RequestDescriptor::new(Method::POST, url("https://example.com/a"));
        let other = RequestDescriptor::get(url("https://example.com/b"));

        assert_ne!(get.cache_key(), post.cache_key());
        assert_ne!(get.cache_key(), other.cache_key());
        assert_eq!(get.cache_key().as_str(), "GET https://example.com/a");
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let key = RequestDescriptor::get(url("https://example.com/a")).cache_key();
        let fingerprint = key.fingerprint();

        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fingerprint, key.clone().fingerprint());
    }

    #[test]
    fn test_ok_only_for_success_statuses() {
        let u = url("https://example.com/");
        assert!(ResponseSnapshot::new(u.clone(), StatusCode::OK, "").ok());
        assert!(ResponseSnapshot::new(u.clone(), StatusCode::NO_CONTENT, "").ok());
        assert!(!ResponseSnapshot::new(u.clone(), StatusCode::NOT_MODIFIED, "").ok());
        assert!(!ResponseSnapshot::new(u.clone(), StatusCode::NOT_FOUND, "").ok());
        assert!(!ResponseSnapshot::new(u, StatusCode::INTERNAL_SERVER_ERROR, "").ok());
    }

    #[test]
    fn test_clone_shares_content_independently() {
        let original = ResponseSnapshot::new(url("https://example.com/"), StatusCode::OK, "body");
        let copy = original.clone();
        drop(original);

        assert_eq!(copy.text(), "body");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut snapshot = ResponseSnapshot::new(url("https://example.com/"), StatusCode::OK, "");
        snapshot
            .headers
            .push(("Content-Type".to_string(), "text/plain".to_string()));

        assert_eq!(snapshot.header("content-type"), Some("text/plain"));
        assert_eq!(snapshot.header("etag"), None);
    }
}
