use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Request;

use super::store::{encode_key, CacheStore};

/// A booking submission parked while the network was down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedSubmission {
    pub request: Request,
    pub queued_at: DateTime<Utc>,
}

/// The pending sync queue: a side bucket of unsent submission requests,
/// keyed by request identity. Entries are removed only after a confirmed
/// successful replay, so they survive restarts and version bumps.
pub struct SyncQueue {
    name: String,
    dir: PathBuf,
}

impl SyncQueue {
    /// Open the queue bucket under the store root, creating it if absent.
    pub fn open(store: &CacheStore, name: &str) -> Result<Self> {
        let dir = store.root().join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create sync queue bucket: {}", name))?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry_path(&self, request: &Request) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(&request.cache_key())))
    }

    /// Park a request for later replay. Re-queueing the same submission
    /// overwrites the previous entry.
    pub fn enqueue(&self, request: &Request) -> Result<()> {
        let entry = QueuedSubmission {
            request: request.clone(),
            queued_at: Utc::now(),
        };
        let path = self.entry_path(request);
        let contents = serde_json::to_string_pretty(&entry)?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to queue submission for {}", request.url))?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        debug!(queue = %self.name, url = %request.url, "queued submission for sync");
        Ok(())
    }

    /// All parked requests, oldest first.
    pub fn pending(&self) -> Result<Vec<Request>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to enumerate sync queue: {}", self.name))?
        {
            let path = dir_entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let entry: QueuedSubmission = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse queued submission {}", path.display()))?;
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.queued_at);
        Ok(entries.into_iter().map(|entry| entry.request).collect())
    }

    /// Drop a request after a confirmed replay. Returns whether it existed.
    pub fn remove(&self, request: &Request) -> Result<bool> {
        let path = self.entry_path(request);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove queued submission for {}", request.url))?;
        Ok(true)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.pending()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.pending()?.is_empty())
    }
}
