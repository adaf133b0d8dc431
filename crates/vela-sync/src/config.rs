//! # Sync Configuration
//!
//! Configuration for the connectivity monitor, sync engine, and checkout
//! gateway, persisted as TOML in the platform config directory.
//!
//! ## File Location
//! - Linux:   `~/.config/vela-pos/sync.toml`
//! - macOS:   `~/Library/Application Support/com.vela.vela-pos/sync.toml`
//! - Windows: `%APPDATA%\vela\vela-pos\config\sync.toml`

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// Config file name within the project config directory.
const CONFIG_FILE: &str = "sync.toml";

/// Sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the checkout server (e.g. `https://pos.example.com`).
    pub server_url: String,

    /// Path probed to judge reachability, relative to `server_url`.
    pub health_path: String,

    /// Milliseconds between reachability probes.
    pub probe_interval_ms: u64,

    /// Per-probe timeout in seconds. A probe that exceeds this counts as
    /// a failure.
    pub probe_timeout_secs: u64,

    /// Consecutive probe failures before the state flips to Offline.
    /// A single success flips it back to Online.
    pub offline_threshold: u32,

    /// Per-submission request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Initial retry backoff in milliseconds.
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in seconds.
    pub max_backoff_secs: u64,

    /// Attempt count at which a queued sale is flagged for operator
    /// attention. The sale is never dropped.
    pub stuck_threshold: i64,

    /// Whether the engine flushes sales left queued by a previous run as
    /// soon as it starts (while online). Draining on reconnect and via
    /// manual sync is unaffected.
    pub drain_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            server_url: String::new(),
            health_path: "/health".into(),
            probe_interval_ms: 5_000,
            probe_timeout_secs: 3,
            offline_threshold: 2,
            request_timeout_secs: 15,
            initial_backoff_ms: 500,
            max_backoff_secs: 60,
            stuck_threshold: 10,
            drain_on_start: true,
        }
    }
}

impl SyncConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.server_url.is_empty() {
            return Err(SyncError::InvalidConfig("server_url is required".into()));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(self.server_url.clone()));
        }
        if self.offline_threshold == 0 {
            return Err(SyncError::InvalidConfig(
                "offline_threshold must be at least 1".into(),
            ));
        }
        if self.probe_interval_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "probe_interval_ms must be at least 1".into(),
            ));
        }
        if self.stuck_threshold <= 0 {
            return Err(SyncError::InvalidConfig(
                "stuck_threshold must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Full URL of the reachability probe endpoint.
    pub fn probe_url(&self) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            self.health_path.trim_start_matches('/')
        )
    }

    /// Probe interval as a Duration.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Probe timeout as a Duration.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Submission timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Initial retry backoff as a Duration.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff ceiling as a Duration.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Returns the config file path, creating the directory if needed.
    fn config_path() -> SyncResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "vela", "vela-pos")
            .ok_or_else(|| SyncError::ConfigLoadFailed("No home directory found".into()))?;
        let dir = dirs.config_dir();
        std::fs::create_dir_all(dir)?;
        Ok(dir.join(CONFIG_FILE))
    }

    /// Loads the config from disk, falling back to defaults if the file
    /// doesn't exist yet.
    pub fn load() -> SyncResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(SyncConfig::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: SyncConfig = toml::from_str(&contents)?;

        info!(path = %path.display(), "Loaded sync config");
        Ok(config)
    }

    /// Saves the config to disk.
    pub fn save(&self) -> SyncResult<()> {
        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }
}
