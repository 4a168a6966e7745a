//! Configuration loading and management
//!
//! Handles parsing of `tasklify.toml` in the data directory and resolving
//! where that directory lives.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::view::{SortBy, SortOrder};

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "tasklify.toml";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKLIFY_DATA_DIR";

/// Hard ceiling on local profiles
pub const MAX_ACCOUNTS: usize = 5;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Profile directory configuration
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Notification timings
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Which key-value backend holds the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    /// Lives only as long as the process; the CLI rejects it
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Cap on stored bytes; writes beyond it fail like a full browser quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Maximum number of local profiles
    #[serde(default = "default_account_limit")]
    pub limit: usize,
}

fn default_account_limit() -> usize {
    MAX_ACCOUNTS
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            limit: default_account_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Insert sample tasks on a user's first load
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,

    /// Initial sort key for list views
    #[serde(default)]
    pub default_sort: SortBy,

    /// Initial sort direction for list views
    #[serde(default)]
    pub default_order: SortOrder,

    /// Dashboard reminder window in days
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,
}

fn default_true() -> bool {
    true
}

fn default_upcoming_days() -> u32 {
    7
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            seed_sample_data: true,
            default_sort: SortBy::default(),
            default_order: SortOrder::default(),
            upcoming_days: default_upcoming_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// How long a toast stays visible
    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: u64,

    /// Quiet period before a typed search query is applied
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

fn default_toast_ttl_ms() -> u64 {
    3000
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            toast_ttl_ms: default_toast_ttl_ms(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `tasklify.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.accounts.limit == 0 || self.accounts.limit > MAX_ACCOUNTS {
            return Err(Error::InvalidConfig(format!(
                "accounts.limit must be between 1 and {MAX_ACCOUNTS}"
            )));
        }
        if self.tasks.upcoming_days == 0 || self.tasks.upcoming_days > 60 {
            return Err(Error::InvalidConfig(
                "tasks.upcoming_days must be between 1 and 60".to_string(),
            ));
        }
        if self.notifications.toast_ttl_ms == 0 {
            return Err(Error::InvalidConfig(
                "notifications.toast_ttl_ms must be > 0".to_string(),
            ));
        }
        if self.storage.quota_bytes == Some(0) {
            return Err(Error::InvalidConfig(
                "storage.quota_bytes must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the data directory.
///
/// Order: explicit flag, `TASKLIFY_DATA_DIR`, platform data dir, `./.tasklify`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if let Ok(raw) = std::env::var(DATA_DIR_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    directories::ProjectDirs::from("", "", "tasklify")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tasklify"))
}
