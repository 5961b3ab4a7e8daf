use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a response was obtained, mirroring the platform's response types.
/// Only `Basic` (straightforward same-origin) responses may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Opaque,
    Error,
}

/// A captured network response: status, headers, and an owned body
/// snapshot. Returning a response to a caller while keeping a cached copy
/// is an ordinary buffer duplication, not a one-shot stream read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    pub kind: ResponseKind,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
            kind: ResponseKind::Basic,
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this response may be written to a cache bucket.
    /// Opaque and error responses must never overwrite good entries.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    /// Header names listed in `Vary`, lower-cased.
    pub fn vary(&self) -> Vec<String> {
        self.header("vary")
            .map(|vary| {
                vary.split(',')
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The body interpreted as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_range() {
        assert!(Response::new(200).ok());
        assert!(Response::new(204).ok());
        assert!(!Response::new(304).ok());
        assert!(!Response::new(404).ok());
    }

    #[test]
    fn test_only_basic_200_is_cacheable() {
        assert!(Response::new(200).is_cacheable());
        assert!(!Response::new(201).is_cacheable());
        assert!(!Response::new(200).with_kind(ResponseKind::Opaque).is_cacheable());
        assert!(!Response::new(200).with_kind(ResponseKind::Error).is_cacheable());
    }

    #[test]
    fn test_vary_parsing() {
        let response = Response::new(200).with_header("Vary", "Accept, Accept-Encoding");
        assert_eq!(response.vary(), vec!["accept", "accept-encoding"]);
        assert!(Response::new(200).vary().is_empty());
    }
}
