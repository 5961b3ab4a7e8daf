use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Request, Response};

/// A captured request/response pair as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub request: Request,
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }
}

/// The cache store: a root directory holding named buckets.
///
/// Bucket names are version strings (`zhwane-driving-v3`); activation
/// deletes every response bucket whose name differs from the current one.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache store at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a bucket, creating it if absent.
    pub fn open(&self, name: &str) -> Result<CacheBucket> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache bucket: {}", name))?;
        Ok(CacheBucket {
            name: name.to_string(),
            dir,
        })
    }

    /// Names of all existing buckets, sorted.
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).context("Failed to enumerate cache buckets")? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.root.join(name).is_dir()
    }

    /// Delete a bucket and everything in it. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to delete cache bucket: {}", name))?;
        Ok(true)
    }
}

/// One named bucket of captured request/response pairs.
///
/// Concurrent writers to the same key race last-write-wins; entries are
/// idempotent snapshots of the same URL's content, so that is acceptable.
#[derive(Debug, Clone)]
pub struct CacheBucket {
    name: String,
    dir: PathBuf,
}

impl CacheBucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry_path(&self, request: &Request) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(&request.cache_key())))
    }

    /// Store a captured response under the request's identity, overwriting
    /// any previous entry for the same key.
    pub fn store(&self, request: &Request, response: &Response) -> Result<()> {
        let entry = CachedEntry::new(request.clone(), response.clone());
        let path = self.entry_path(request);
        let contents = serde_json::to_string_pretty(&entry)?;

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to write cache entry for {}", request.url))?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        debug!(bucket = %self.name, url = %request.url, "stored cache entry");
        Ok(())
    }

    /// Exact-identity lookup. A stored response carrying a `Vary` header
    /// additionally requires the named request headers to match.
    pub fn lookup(&self, request: &Request) -> Result<Option<Response>> {
        let path = self.entry_path(request);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache entry for {}", request.url))?;
        let entry: CachedEntry = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry for {}", request.url))?;

        for header in entry.response.vary() {
            if header == "*" {
                return Ok(None);
            }
            if entry.request.header(&header) != request.header(&header) {
                return Ok(None);
            }
        }

        Ok(Some(entry.response))
    }

    /// Lookup by bare URL, as the root-document and fallback-icon paths do.
    pub fn lookup_url(&self, url: &str) -> Result<Option<Response>> {
        self.lookup(&Request::get(url))
    }

    /// Remove the entry for a request. Returns whether one existed.
    pub fn remove(&self, request: &Request) -> Result<bool> {
        let path = self.entry_path(request);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove cache entry for {}", request.url))?;
        Ok(true)
    }

    /// The requests of all stored entries, in key order.
    pub fn requests(&self) -> Result<Vec<Request>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to enumerate cache bucket: {}", self.name))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut requests = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = fs::read_to_string(&path)?;
            let entry: CachedEntry = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse cache entry {}", path.display()))?;
            requests.push(entry.request);
        }
        Ok(requests)
    }
}

/// Encode a cache key into a filename. Alphanumerics and `._-` pass
/// through; every other byte becomes `%XX`, so distinct keys never
/// collide and paths with spaces round-trip exactly.
pub(crate) fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
