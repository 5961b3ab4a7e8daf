//! The offline worker core.
//!
//! `ServiceWorker` owns the cache store, the network seam, and the
//! configuration, and exposes one method per lifecycle event:
//!
//! - `on_install`: best-effort precache of the application shell
//! - `on_activate`: eviction of superseded cache buckets
//! - `on_fetch`: routed request handling (see [`router`])
//! - `on_sync`: replay of queued booking submissions (see [`sync`])
//! - `on_push`: notification descriptor construction (see [`notify`])
//!
//! The worker never runs autonomously; a host drives it, either directly
//! or through the `platform` event loop.

pub mod notify;
pub mod router;
pub mod sync;

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::cache::{CacheBucket, CacheStore, SyncQueue};
use crate::config::WorkerConfig;
use crate::models::{Notification, Request, Response};
use crate::net::{Fetch, FetchError};

pub use router::{classify, RouteClass};
pub use sync::SyncReport;

/// Maximum concurrent shell fetches during install.
/// Bounds cold-start fan-out so precache does not saturate the connection.
const MAX_PRECACHE_CONCURRENCY: usize = 8;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, no lifecycle event processed yet.
    New,
    /// Install event in progress.
    Installing,
    /// Installed and, under the skip-waiting policy, ready to replace any
    /// previously active instance without waiting for clients to close.
    Installed,
    /// Activate event in progress.
    Activating,
    /// Controlling clients and serving fetches.
    Activated,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::New => write!(f, "new"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
        }
    }
}

/// Outcome of one precache manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrecacheOutcome {
    Cached,
    /// Fetch or store failed; the entry is simply absent from the cache.
    Skipped(String),
}

/// Per-URL results of an install pass. A skipped entry never fails the
/// install; the report says what the shell cache actually holds.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<(String, PrecacheOutcome)>,
    /// The worker requests immediate replacement of older instances.
    pub skip_waiting: bool,
}

impl InstallReport {
    pub fn cached(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == PrecacheOutcome::Cached)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.cached()
    }
}

/// Results of an activate pass.
#[derive(Debug)]
pub struct ActivateReport {
    /// Superseded response buckets that were deleted.
    pub deleted_buckets: Vec<String>,
    /// The worker takes control of open clients without a reload.
    pub claimed_clients: bool,
}

pub struct ServiceWorker {
    config: WorkerConfig,
    store: CacheStore,
    fetcher: Arc<dyn Fetch>,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, store: CacheStore, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            store,
            fetcher,
            state: RwLock::new(WorkerState::New),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().expect("worker state lock poisoned")
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write().expect("worker state lock poisoned") = state;
    }

    fn bucket(&self) -> Result<CacheBucket> {
        self.store.open(&self.config.cache_name)
    }

    fn queue(&self) -> Result<SyncQueue> {
        SyncQueue::open(&self.store, &self.config.sync_cache_name)
    }

    /// Install: open the versioned bucket and precache the shell,
    /// best-effort. Individual fetch failures are logged and skipped,
    /// never failing the install. Completes into `Installed` immediately
    /// (skip-waiting policy).
    pub async fn on_install(&self) -> Result<InstallReport> {
        self.set_state(WorkerState::Installing);
        info!(bucket = %self.config.cache_name, "worker installing");

        let bucket = self.bucket()?;
        let mut outcomes: Vec<(usize, String, PrecacheOutcome)> =
            stream::iter(self.config.precache_manifest.iter().cloned().enumerate())
                .map(|(index, url)| {
                    let fetcher = Arc::clone(&self.fetcher);
                    let bucket = bucket.clone();
                    async move {
                        let outcome = precache_one(fetcher.as_ref(), &bucket, &url).await;
                        (index, url, outcome)
                    }
                })
                .buffer_unordered(MAX_PRECACHE_CONCURRENCY)
                .collect()
                .await;
        // Report in manifest order regardless of completion order
        outcomes.sort_by_key(|(index, _, _)| *index);

        let report = InstallReport {
            outcomes: outcomes
                .into_iter()
                .map(|(_, url, outcome)| (url, outcome))
                .collect(),
            skip_waiting: true,
        };
        info!(cached = report.cached(), skipped = report.skipped(), "worker installed");
        self.set_state(WorkerState::Installed);
        Ok(report)
    }

    /// Activate: delete every response bucket whose name differs from the
    /// current version, then claim open clients. The pending sync queue is
    /// not a response cache and survives version bumps. Enumeration and
    /// deletion failures propagate.
    pub async fn on_activate(&self) -> Result<ActivateReport> {
        self.set_state(WorkerState::Activating);
        info!(bucket = %self.config.cache_name, "worker activating");

        let mut deleted = Vec::new();
        for name in self.store.bucket_names().context("Failed to enumerate cache buckets")? {
            if name == self.config.cache_name || name == self.config.sync_cache_name {
                continue;
            }
            self.store.delete(&name)?;
            info!(bucket = %name, "deleted stale cache bucket");
            deleted.push(name);
        }

        self.set_state(WorkerState::Activated);
        Ok(ActivateReport {
            deleted_buckets: deleted,
            claimed_clients: true,
        })
    }

    /// Fetch: resolve exactly one response for an intercepted request.
    pub async fn on_fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.route(request).await
    }

    /// Sync: replay queued submissions for the matching tag.
    pub async fn on_sync(&self, tag: &str) -> Result<SyncReport> {
        self.replay_pending(tag).await
    }

    /// Push: build the notification descriptor for display.
    pub fn on_push(&self, payload: Option<&[u8]>) -> Notification {
        notify::present(&self.config.notification, payload)
    }
}

async fn precache_one(fetcher: &dyn Fetch, bucket: &CacheBucket, url: &str) -> PrecacheOutcome {
    let request = Request::get(url);
    match fetcher.fetch(&request).await {
        Ok(response) if response.is_cacheable() => match bucket.store(&request, &response) {
            Ok(()) => PrecacheOutcome::Cached,
            Err(e) => {
                warn!(url, error = %e, "failed to store shell entry");
                PrecacheOutcome::Skipped(e.to_string())
            }
        },
        Ok(response) => {
            warn!(url, status = response.status, "skipping uncacheable shell response");
            PrecacheOutcome::Skipped(format!("status {}", response.status))
        }
        Err(e) => {
            warn!(url, error = %e, "failed to precache shell entry");
            PrecacheOutcome::Skipped(e.to_string())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::stub_worker;
    use super::*;
    use crate::models::ResponseKind;

    fn shell_config(manifest: &[&str]) -> WorkerConfig {
        WorkerConfig {
            precache_manifest: manifest.iter().map(|url| url.to_string()).collect(),
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_install_precaches_reachable_shell() {
        let (_guard, fetch, worker) = stub_worker(shell_config(&["/", "/manifest.json"]));
        fetch.respond("/", Response::new(200).with_body("<html>"));
        fetch.respond("/manifest.json", Response::new(200).with_body("{}"));

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached(), 2);
        assert_eq!(report.skipped(), 0);
        assert!(report.skip_waiting);
        assert_eq!(worker.state(), WorkerState::Installed);

        let bucket = worker.store.open(&worker.config.cache_name).unwrap();
        let cached = bucket.lookup_url("/").unwrap().unwrap();
        assert_eq!(cached.status, 200);
    }

    #[tokio::test]
    async fn test_install_skips_unreachable_entries() {
        // "/manifest.json" has no stub route, so its fetch fails
        let (_guard, fetch, worker) = stub_worker(shell_config(&["/", "/manifest.json"]));
        fetch.respond("/", Response::new(200).with_body("<html>"));

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.outcomes[0].1, PrecacheOutcome::Cached);
        assert!(matches!(report.outcomes[1].1, PrecacheOutcome::Skipped(_)));

        let bucket = worker.store.open(&worker.config.cache_name).unwrap();
        assert!(bucket.lookup_url("/").unwrap().is_some());
        assert!(bucket.lookup_url("/manifest.json").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_install_report_preserves_manifest_order() {
        let manifest = ["/", "/index.html", "/logo.svg"];
        let (_guard, fetch, worker) = stub_worker(shell_config(&manifest));
        for url in manifest {
            fetch.respond(url, Response::new(200));
        }

        let report = worker.on_install().await.unwrap();
        let urls: Vec<&str> = report.outcomes.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(urls, manifest);
    }

    #[tokio::test]
    async fn test_install_does_not_cache_error_statuses() {
        let (_guard, fetch, worker) = stub_worker(shell_config(&["/missing.png"]));
        fetch.respond("/missing.png", Response::new(404));

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached(), 0);

        let bucket = worker.store.open(&worker.config.cache_name).unwrap();
        assert!(bucket.lookup_url("/missing.png").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_deletes_superseded_buckets() {
        let (_guard, _fetch, worker) = stub_worker(WorkerConfig::default());
        worker.store.open("zhwane-driving-v1").unwrap();
        worker.store.open("zhwane-driving-v2").unwrap();
        worker.store.open(&worker.config.cache_name).unwrap();

        let report = worker.on_activate().await.unwrap();
        assert_eq!(
            report.deleted_buckets,
            vec!["zhwane-driving-v1", "zhwane-driving-v2"]
        );
        assert!(report.claimed_clients);
        assert_eq!(worker.state(), WorkerState::Activated);
        assert_eq!(
            worker.store.bucket_names().unwrap(),
            vec![worker.config.cache_name.clone()]
        );
    }

    #[tokio::test]
    async fn test_activate_preserves_sync_queue() {
        let (_guard, _fetch, worker) = stub_worker(WorkerConfig::default());
        worker.store.open("zhwane-driving-v1").unwrap();
        worker.store.open(&worker.config.sync_cache_name).unwrap();

        let report = worker.on_activate().await.unwrap();
        assert_eq!(report.deleted_buckets, vec!["zhwane-driving-v1"]);
        assert!(worker.store.contains(&worker.config.sync_cache_name));
    }

    #[tokio::test]
    async fn test_uncacheable_precache_response_is_skipped() {
        let (_guard, fetch, worker) = stub_worker(shell_config(&["/logo.svg"]));
        fetch.respond(
            "/logo.svg",
            Response::new(200).with_kind(ResponseKind::Opaque),
        );

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached(), 0);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::New.to_string(), "new");
        assert_eq!(WorkerState::Activated.to_string(), "activated");
    }
}
