//! Request routing policies.
//!
//! Navigations, API calls, and anything that accepts HTML go
//! network-first with a cache fallback; static assets go cache-first with
//! a network fill. Only straightforward 200 responses are written back to
//! the bucket, so opaque and error responses never clobber good entries.

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::models::{Destination, Request, Response};
use crate::net::FetchError;

use super::ServiceWorker;

/// Which policy serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    NetworkFirst,
    CacheFirst,
}

/// Classify an intercepted request. Navigation-like traffic (top-level
/// navigations, API paths, anything accepting HTML) is network-first;
/// everything else is asset-like and cache-first.
pub fn classify(config: &WorkerConfig, request: &Request) -> RouteClass {
    if request.navigate
        || request.path().starts_with(&config.api_prefix)
        || request.accepts_html()
    {
        RouteClass::NetworkFirst
    } else {
        RouteClass::CacheFirst
    }
}

impl ServiceWorker {
    pub(super) async fn route(&self, request: &Request) -> Result<Response, FetchError> {
        match classify(&self.config, request) {
            RouteClass::NetworkFirst => self.network_first(request).await,
            RouteClass::CacheFirst => self.cache_first(request).await,
        }
    }

    /// Live fetch under the configured timeout; fall back to the cached
    /// exact match, then to the cached root document.
    async fn network_first(&self, request: &Request) -> Result<Response, FetchError> {
        let live = match timeout(self.config.network_timeout(), self.fetcher.fetch(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match live {
            Ok(response) => {
                self.store_copy(request, &response);
                Ok(response)
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "network-first fetch failed, trying cache");
                if let Some(cached) = self.cached(request) {
                    return Ok(cached);
                }
                if let Some(shell) = self.cached_url(&self.config.root_document) {
                    return Ok(shell);
                }
                Err(err)
            }
        }
    }

    /// Cached exact match if present, else a network fill. A failed image
    /// fetch degrades to the fallback icon; other failures propagate.
    async fn cache_first(&self, request: &Request) -> Result<Response, FetchError> {
        if let Some(cached) = self.cached(request) {
            return Ok(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_copy(request, &response);
                Ok(response)
            }
            Err(err) => {
                if request.destination == Destination::Image {
                    if let Some(icon) = self.cached_url(&self.config.fallback_icon) {
                        debug!(url = %request.url, "serving fallback icon for failed image");
                        return Ok(icon);
                    }
                }
                Err(err)
            }
        }
    }

    /// Cache lookup that treats store errors as misses.
    fn cached(&self, request: &Request) -> Option<Response> {
        match self.bucket() {
            Ok(bucket) => match bucket.lookup(request) {
                Ok(found) => found,
                Err(e) => {
                    warn!(url = %request.url, error = %e, "cache lookup failed");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to open cache bucket");
                None
            }
        }
    }

    fn cached_url(&self, url: &str) -> Option<Response> {
        self.cached(&Request::get(url))
    }

    /// Keep a copy of a good response. Store failures never fail the
    /// fetch; the live response still goes back to the page.
    fn store_copy(&self, request: &Request, response: &Response) {
        if !response.is_cacheable() {
            return;
        }
        match self.bucket() {
            Ok(bucket) => {
                if let Err(e) = bucket.store(request, response) {
                    warn!(url = %request.url, error = %e, "failed to store cache entry");
                }
            }
            Err(e) => warn!(error = %e, "failed to open cache bucket"),
        }
    }
}
