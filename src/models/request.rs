use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What kind of resource a request is for, as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    #[default]
    Other,
}

/// An intercepted network request, captured as an owned snapshot.
///
/// The body is an immutable byte buffer; storing a request in a cache
/// bucket copies the buffer rather than consuming a stream. Header names
/// are kept lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    /// Set when the browser issued this request as a top-level navigation.
    #[serde(default)]
    pub navigate: bool,
    #[serde(default)]
    pub destination: Destination,
}

impl Request {
    /// Create a bare GET request, the shape precache and fallback lookups use.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
            navigate: false,
            destination: Destination::Other,
        }
    }

    /// Create a POST request carrying a body.
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body,
            navigate: false,
            destination: Destination::Other,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_navigate(mut self, navigate: bool) -> Self {
        self.navigate = navigate;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The path component of the URL, without query or fragment.
    /// Relative URLs (`/course/...`) are returned as-is.
    pub fn path(&self) -> &str {
        let without_query = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        if let Some((_, rest)) = without_query.split_once("://") {
            match rest.find('/') {
                Some(i) => &rest[i..],
                None => "/",
            }
        } else {
            without_query
        }
    }

    /// Whether the `Accept` header indicates an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.header("accept")
            .map(|accept| accept.contains("text/html"))
            .unwrap_or(false)
    }

    /// Cache identity: method plus full URL. Exact matching only; the
    /// stored response's `Vary` header is honored at lookup time.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}
