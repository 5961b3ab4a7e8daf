//! Live network client.
//!
//! `HttpClient` resolves the site-relative URLs the shell uses against a
//! configured origin and captures full responses into owned snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::models::{Request, Response, ResponseKind};

use super::FetchError;

/// HTTP request timeout in seconds.
/// A hard upper bound under the router's own network-first timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The network seam. Everything the worker fetches live goes through
/// this trait, so tests can run against stubs instead of a real network.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform a live fetch, capturing the full response body.
    /// Transport failures are errors; HTTP error statuses are captured
    /// responses.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Live client over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    origin: String,
}

impl HttpClient {
    /// Create a client that resolves site-relative URLs against `origin`
    /// (e.g. `https://zhwane.co.za`).
    pub fn new(origin: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.origin, url)
        }
    }

    fn is_same_origin(&self, url: &str) -> bool {
        !url.starts_with("http://") && !url.starts_with("https://")
            || url.starts_with(&self.origin)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("bad method: {}", request.method)))?;
        let url = self.absolute_url(&request.url);

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let kind = if self.is_same_origin(&request.url) {
            ResponseKind::Basic
        } else {
            ResponseKind::Opaque
        };

        let body = response.bytes().await?.to_vec();
        debug!(url = %request.url, status, bytes = body.len(), "fetched");

        Ok(Response {
            status,
            headers,
            body,
            kind,
        })
    }
}
