//! Background sync agent.
//!
//! Replays booking submissions parked in the pending queue when the
//! platform signals connectivity. Each entry is handled independently: a
//! failed replay leaves its entry queued for the next trigger and never
//! aborts the rest of the queue.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::ServiceWorker;

/// What one sync pass did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Submission URLs replayed and removed from the queue.
    pub replayed: Vec<String>,
    /// Submission URLs that stay queued for the next trigger.
    pub retained: Vec<String>,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.replayed.len() + self.retained.len()
    }
}

impl ServiceWorker {
    pub(super) async fn replay_pending(&self, tag: &str) -> Result<SyncReport> {
        if tag != self.config.sync_tag {
            debug!(tag, "ignoring sync event with foreign tag");
            return Ok(SyncReport::default());
        }

        let queue = self.queue()?;
        let mut report = SyncReport::default();

        for request in queue.pending().context("Failed to read pending submissions")? {
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.ok() => match queue.remove(&request) {
                    Ok(_) => {
                        info!(url = %request.url, "replayed queued submission");
                        report.replayed.push(request.url);
                    }
                    Err(e) => {
                        warn!(url = %request.url, error = %e, "replayed submission but failed to dequeue it");
                        report.retained.push(request.url);
                    }
                },
                Ok(response) => {
                    warn!(
                        url = %request.url,
                        status = response.status,
                        "endpoint rejected replay, keeping entry queued"
                    );
                    report.retained.push(request.url);
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "replay failed, keeping entry queued");
                    report.retained.push(request.url);
                }
            }
        }

        Ok(report)
    }
}
