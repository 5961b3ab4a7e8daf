//! Worker configuration.
//!
//! Every tunable of the offline worker lives in one explicit struct handed
//! to the worker constructor, so multiple cache versions and environments
//! can be exercised in isolation. The defaults reproduce the constants the
//! production site ships with.
//!
//! Configuration is stored at `~/.config/drivecache/worker.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "drivecache";

/// Config file name
const CONFIG_FILE: &str = "worker.json";

/// Versioned name of the response cache bucket. Bumping this literal is
/// the only mechanism that invalidates previously cached entries.
const DEFAULT_CACHE_NAME: &str = "zhwane-driving-v3";

/// Side bucket holding booking submissions awaiting replay.
const DEFAULT_SYNC_CACHE_NAME: &str = "booking-forms-cache";

/// Sync event tag this worker responds to.
const DEFAULT_SYNC_TAG: &str = "booking-form-sync";

/// Network-first timeout in seconds.
/// Short enough that an offline page falls back to cache quickly.
const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 10;

/// Fixed visual template for push notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStyle {
    pub title: String,
    pub default_body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            title: "Zhwane Driving School".to_string(),
            default_body: "New notification".to_string(),
            icon: "/logo.svg".to_string(),
            badge: "/logo.svg".to_string(),
            vibrate: vec![200, 100, 200],
            tag: "driving-school-notification".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Versioned response bucket name; see [`DEFAULT_CACHE_NAME`].
    pub cache_name: String,
    /// Application shell URLs fetched proactively at install.
    pub precache_manifest: Vec<String>,
    pub sync_cache_name: String,
    pub sync_tag: String,
    /// Path prefix routed network-first alongside navigations.
    pub api_prefix: String,
    /// Final offline fallback for failed navigations.
    pub root_document: String,
    /// Served when an image can be fetched neither live nor from cache.
    pub fallback_icon: String,
    pub network_timeout_secs: u64,
    pub notification: NotificationStyle,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            precache_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/static/js/bundle.js".to_string(),
                "/static/css/main.css".to_string(),
                "/manifest.json".to_string(),
                "/heropicture.jpeg".to_string(),
                "/logo.svg".to_string(),
                "/logo192.svg".to_string(),
                "/logo512.svg".to_string(),
            ],
            sync_cache_name: DEFAULT_SYNC_CACHE_NAME.to_string(),
            sync_tag: DEFAULT_SYNC_TAG.to_string(),
            api_prefix: "/api/".to_string(),
            root_document: "/".to_string(),
            fallback_icon: "/logo.svg".to_string(),
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            notification: NotificationStyle::default(),
        }
    }
}

impl WorkerConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Default on-disk location for the cache store.
    pub fn store_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_constants() {
        let config = WorkerConfig::default();
        assert_eq!(config.cache_name, "zhwane-driving-v3");
        assert_eq!(config.sync_cache_name, "booking-forms-cache");
        assert_eq!(config.sync_tag, "booking-form-sync");
        assert_eq!(config.precache_manifest.first().map(String::as_str), Some("/"));
        assert!(config.precache_manifest.contains(&"/manifest.json".to_string()));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = WorkerConfig::default();
        config.cache_name = "zhwane-driving-v4".to_string();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: WorkerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cache_name, "zhwane-driving-v4");
        assert_eq!(parsed.notification.vibrate, vec![200, 100, 200]);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: WorkerConfig =
            serde_json::from_str(r#"{"cache_name": "zhwane-driving-v9"}"#).unwrap();
        assert_eq!(parsed.cache_name, "zhwane-driving-v9");
        assert_eq!(parsed.api_prefix, "/api/");
        assert_eq!(parsed.network_timeout_secs, DEFAULT_NETWORK_TIMEOUT_SECS);
    }
}
