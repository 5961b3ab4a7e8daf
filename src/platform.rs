//! Platform adapter shim.
//!
//! Bridges browser-style lifecycle events onto the worker: a host feeds
//! `WorkerEvent`s through a channel and the `WorkerHost` loop dispatches
//! them. Install, activate, and sync are processed run-to-completion, so
//! install always finishes before anything queued behind it and a sync
//! pass keeps the worker alive until the whole queue has been attempted.
//! Fetch events are served on independent tasks and may interleave
//! arbitrarily, each replying through its own oneshot channel.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::models::{Notification, Request, Response};
use crate::net::FetchError;
use crate::worker::ServiceWorker;

/// Buffer size for the event channel.
/// A navigation burst rarely exceeds a dozen in-flight requests.
const EVENT_BUFFER_SIZE: usize = 32;

/// A lifecycle event as the platform delivers it.
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch {
        request: Request,
        reply: oneshot::Sender<Result<Response, FetchError>>,
    },
    Sync {
        tag: String,
    },
    Push {
        payload: Option<Vec<u8>>,
    },
}

/// Cheap-to-clone sender half used by the hosting side.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerEvent>,
}

impl WorkerHandle {
    async fn send(&self, event: WorkerEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow!("worker event loop closed"))
    }

    pub async fn install(&self) -> Result<()> {
        self.send(WorkerEvent::Install).await
    }

    pub async fn activate(&self) -> Result<()> {
        self.send(WorkerEvent::Activate).await
    }

    pub async fn sync(&self, tag: impl Into<String>) -> Result<()> {
        self.send(WorkerEvent::Sync { tag: tag.into() }).await
    }

    pub async fn push(&self, payload: Option<Vec<u8>>) -> Result<()> {
        self.send(WorkerEvent::Push { payload }).await
    }

    /// Intercept a request and wait for the worker's response.
    pub async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(WorkerEvent::Fetch { request, reply })
            .await
            .map_err(|_| FetchError::Transport("worker event loop closed".to_string()))?;
        response
            .await
            .map_err(|_| FetchError::Transport("worker dropped the request".to_string()))?
    }
}

/// The event loop driving a worker instance.
pub struct WorkerHost {
    worker: Arc<ServiceWorker>,
    rx: mpsc::Receiver<WorkerEvent>,
    notifications: Option<mpsc::Sender<Notification>>,
}

impl WorkerHost {
    pub fn new(worker: ServiceWorker) -> (WorkerHandle, WorkerHost) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        (
            WorkerHandle { tx },
            WorkerHost {
                worker: Arc::new(worker),
                rx,
                notifications: None,
            },
        )
    }

    /// Deliver push notification descriptors to a channel instead of the log.
    pub fn with_notifications(mut self, sender: mpsc::Sender<Notification>) -> Self {
        self.notifications = Some(sender);
        self
    }

    pub fn worker(&self) -> &Arc<ServiceWorker> {
        &self.worker
    }

    /// Process events until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match event {
                WorkerEvent::Install => {
                    if let Err(e) = self.worker.on_install().await {
                        error!(error = %e, "install failed");
                    }
                }
                WorkerEvent::Activate => {
                    if let Err(e) = self.worker.on_activate().await {
                        error!(error = %e, "activate failed");
                    }
                }
                WorkerEvent::Fetch { request, reply } => {
                    // Concurrent requests are independent of one another
                    let worker = Arc::clone(&self.worker);
                    tokio::spawn(async move {
                        let result = worker.on_fetch(&request).await;
                        if reply.send(result).is_err() {
                            debug!(url = %request.url, "fetch caller went away before the response");
                        }
                    });
                }
                WorkerEvent::Sync { tag } => match self.worker.on_sync(&tag).await {
                    Ok(report) if report.attempted() > 0 => {
                        info!(
                            replayed = report.replayed.len(),
                            retained = report.retained.len(),
                            "sync pass finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "sync pass failed"),
                },
                WorkerEvent::Push { payload } => {
                    let notification = self.worker.on_push(payload.as_deref());
                    match &self.notifications {
                        Some(sender) => {
                            if sender.send(notification).await.is_err() {
                                warn!("notification receiver dropped");
                            }
                        }
                        None => info!(
                            title = %notification.title,
                            body = %notification.body,
                            "displaying notification"
                        ),
                    }
                }
            }
        }
        debug!("event queue closed, worker host shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::models::Destination;
    use crate::worker::testing::stub_worker;

    fn navigation(url: &str) -> Request {
        Request::get(url)
            .with_navigate(true)
            .with_header("accept", "text/html")
            .with_destination(Destination::Document)
    }

    #[tokio::test]
    async fn test_install_completes_before_queued_fetches() {
        let (_guard, fetch, worker) = stub_worker(WorkerConfig {
            precache_manifest: vec!["/".to_string()],
            ..WorkerConfig::default()
        });
        fetch.respond("/", Response::new(200).with_body("shell"));

        let (handle, host) = WorkerHost::new(worker);
        tokio::spawn(host.run());

        handle.install().await.unwrap();
        handle.activate().await.unwrap();
        // Awaiting the response also proves install and activate finished
        let served = handle.fetch(navigation("/")).await.unwrap();
        assert_eq!(served.text(), "shell");

        // With the shell precached, an offline navigation still resolves
        fetch.set_offline(true);
        let offline = handle.fetch(navigation("/blog")).await.unwrap();
        assert_eq!(offline.text(), "shell");
    }

    #[tokio::test]
    async fn test_concurrent_fetches_interleave() {
        let (_guard, fetch, worker) = stub_worker(WorkerConfig::default());
        fetch.respond("/static/css/main.css", Response::new(200).with_body("css"));
        fetch.respond("/static/js/bundle.js", Response::new(200).with_body("js"));
        // Neither fetch can finish until both are in flight
        fetch.set_barrier(2);

        let (handle, host) = WorkerHost::new(worker);
        tokio::spawn(host.run());

        let css = tokio::spawn({
            let handle = handle.clone();
            async move { handle.fetch(Request::get("/static/css/main.css")).await }
        });
        let js = tokio::spawn({
            let handle = handle.clone();
            async move { handle.fetch(Request::get("/static/js/bundle.js")).await }
        });

        assert_eq!(css.await.unwrap().unwrap().text(), "css");
        assert_eq!(js.await.unwrap().unwrap().text(), "js");
    }

    #[tokio::test]
    async fn test_sync_event_drains_queue_before_later_events() {
        let (guard, fetch, worker) = stub_worker(WorkerConfig::default());
        fetch.respond("/api/bookings", Response::new(200));
        fetch.respond("/logo.svg", Response::new(200));

        // Same store root as the worker's
        let store = crate::cache::CacheStore::new(guard.path().to_path_buf()).unwrap();
        let queue =
            crate::cache::SyncQueue::open(&store, &worker.config().sync_cache_name).unwrap();
        queue.enqueue(&Request::post("/api/bookings", b"{}".to_vec())).unwrap();

        let (handle, host) = WorkerHost::new(worker);
        tokio::spawn(host.run());

        handle.sync("booking-form-sync").await.unwrap();
        // The loop processes sync inline, so this fetch ran after it
        handle.fetch(Request::get("/logo.svg")).await.unwrap();

        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_push_forwards_descriptor() {
        let (_guard, _fetch, worker) = stub_worker(WorkerConfig::default());
        let (notify_tx, mut notify_rx) = mpsc::channel(4);

        let (handle, host) = WorkerHost::new(worker);
        tokio::spawn(host.with_notifications(notify_tx).run());

        handle.push(Some(b"Lesson confirmed".to_vec())).await.unwrap();
        let notification = notify_rx.recv().await.unwrap();
        assert_eq!(notification.body, "Lesson confirmed");
        assert_eq!(notification.title, "Zhwane Driving School");
        assert!(notification.require_interaction);
    }
}
