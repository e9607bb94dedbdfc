//! # Configuration Module
//!
//! Runtime settings for the engine and the command-line front end.
//!
//! ## Config File
//!
//! Settings are read from `config.json` in the platform-standard config
//! directory:
//! - Linux: `~/.config/tunematch/config.json`
//! - macOS: `~/Library/Application Support/tunematch/config.json`
//! - Windows: `%APPDATA%\tunematch\config.json`
//!
//! A missing file means defaults. Any field left out of the file also takes
//! its default.
//!
//! ```json
//! {
//!   "recommendation_limit": 10,
//!   "sync": { "fetch_limit": 50, "max_attempts": 3, "backoff_ms": 250 }
//! }
//! ```
//!
//! The compatibility weights are fixed and not part of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest window the provider is asked for in a single sync
pub const MAX_FETCH_LIMIT: usize = 50;

/// Default number of recommended users
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// Returns the platform-appropriate config file path.
///
/// Does not create anything; the file is optional.
///
/// # Errors
///
/// Fails if the system config directory cannot be determined.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Pass --config to point at a config file."
        )
    })?;

    Ok(config_dir.join("tunematch").join("config.json"))
}

/// How a profile sync talks to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Items requested per list, capped at [`MAX_FETCH_LIMIT`]
    pub fetch_limit: usize,
    /// Total tries for a sync that hits retryable upstream failures
    pub max_attempts: u32,
    /// Base delay between tries, multiplied by the attempt number
    pub backoff_ms: u64,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            fetch_limit: MAX_FETCH_LIMIT,
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

impl SyncPolicy {
    /// Fetch window actually used, always within `1..=MAX_FETCH_LIMIT`.
    #[must_use]
    pub fn effective_fetch_limit(&self) -> usize {
        self.fetch_limit.clamp(1, MAX_FETCH_LIMIT)
    }

    /// Delay before retrying after failed attempt number `attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default length of a recommendation list
    pub recommendation_limit: usize,
    pub sync: SyncPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
            sync: SyncPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load from the platform config path, or defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;
        if path.exists() {
            Self::from_path(&path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from an explicit file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid config JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_structure() {
        let path = get_config_path().expect("Should get valid path");

        assert!(path.ends_with("tunematch/config.json"));
        assert!(path.is_absolute(), "Config path should be absolute");
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.recommendation_limit, 10);
        assert_eq!(config.sync.fetch_limit, 50);
        assert_eq!(config.sync.max_attempts, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sync": {"max_attempts": 5}}"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.recommendation_limit, 10);
        assert_eq!(config.sync.max_attempts, 5);
        assert_eq!(config.sync.fetch_limit, 50);
        assert_eq!(config.sync.backoff_ms, 250);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = EngineConfig::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_missing_file_is_an_error_when_explicit() {
        let dir = TempDir::new().unwrap();
        assert!(EngineConfig::from_path(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_fetch_limit_is_capped() {
        let policy = SyncPolicy { fetch_limit: 500, ..SyncPolicy::default() };
        assert_eq!(policy.effective_fetch_limit(), 50);

        let policy = SyncPolicy { fetch_limit: 0, ..SyncPolicy::default() };
        assert_eq!(policy.effective_fetch_limit(), 1);

        let policy = SyncPolicy { fetch_limit: 20, ..SyncPolicy::default() };
        assert_eq!(policy.effective_fetch_limit(), 20);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = SyncPolicy { backoff_ms: 100, ..SyncPolicy::default() };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
    }
}
