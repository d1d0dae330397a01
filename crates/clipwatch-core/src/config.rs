//! Clipwatch configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClipwatchConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
}

/// Backing store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the sqlite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    ClipwatchConfig::home_dir().join("clipwatch.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Backoff base delay after the first failure, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Backoff ceiling, in seconds.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Pending mentions older than this are expired by the sweeper.
    #[serde(default = "default_pending_ttl_hours")]
    pub pending_ttl_hours: u64,
    /// Max mention groups fetched per claim cycle.
    #[serde(default = "default_claim_batch_limit")]
    pub claim_batch_limit: u32,
    /// How often the claim loop runs, in seconds.
    #[serde(default = "default_claim_interval_secs")]
    pub claim_interval_secs: u64,
    /// How often the sweeper runs, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_backoff_base_secs() -> u64 { 60 }
fn default_backoff_max_secs() -> u64 { 3600 }
fn default_pending_ttl_hours() -> u64 { 24 }
fn default_claim_batch_limit() -> u32 { 50 }
fn default_claim_interval_secs() -> u64 { 60 }
fn default_sweep_interval_secs() -> u64 { 900 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            pending_ttl_hours: default_pending_ttl_hours(),
            claim_batch_limit: default_claim_batch_limit(),
            claim_interval_secs: default_claim_interval_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Endpoints of the external collaborator services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Crawler service URL (ingestion executor).
    #[serde(default = "default_crawler_url")]
    pub crawler_url: String,
    /// Analyzer service URL (mention evaluation).
    #[serde(default = "default_analyzer_url")]
    pub analyzer_url: String,
    /// Webhook receiving urgent alerts (fast path). Empty = log only.
    #[serde(default)]
    pub alert_webhook_url: String,
    /// Per-request timeout for collaborator calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_crawler_url() -> String { "http://127.0.0.1:8741/crawl".into() }
fn default_analyzer_url() -> String { "http://127.0.0.1:8742/evaluate".into() }
fn default_request_timeout_secs() -> u64 { 120 }

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            crawler_url: default_crawler_url(),
            analyzer_url: default_analyzer_url(),
            alert_webhook_url: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClipwatchConfig {
    /// Load config from the default path (~/.clipwatch/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ClipwatchError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::ClipwatchError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ClipwatchError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// The ~/.clipwatch directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clipwatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClipwatchConfig::default();
        assert_eq!(config.scheduler.backoff_base_secs, 60);
        assert_eq!(config.scheduler.pending_ttl_hours, 24);
        assert_eq!(config.collaborators.request_timeout_secs, 120);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClipwatchConfig = toml::from_str(
            "[scheduler]\nbackoff_base_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.scheduler.backoff_base_secs, 30);
        // Untouched fields keep their defaults.
        assert_eq!(config.scheduler.backoff_max_secs, 3600);
        assert_eq!(config.scheduler.claim_batch_limit, 50);
    }
}
