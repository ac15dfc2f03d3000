//! Configuration types and defaults.

use crate::datetime::DisplayTimezone;
use crate::scheduler::DEFAULT_POLL_INTERVAL;
use crate::store::{DEFAULT_LOCK_TIMEOUT, StoreOptions};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-user application directory under `$HOME`.
pub const APP_DIR: &str = ".dailytaskreminder";

/// Task file name inside a storage directory.
pub const TASKS_FILE: &str = "tasks.json";

/// Task file location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON task file. A leading `~/` expands to the home directory.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// How long a write waits for the cross-process lock (default: 5000).
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("~").join(APP_DIR).join(TASKS_FILE)
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT.as_millis() as u64
}

/// Reminder scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between polls (default: 60).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pop up a desktop notification when `notify-send` is available.
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            desktop_notifications: true,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// `UTC`, `local`, or a fixed offset such as `+08:00`.
    #[serde(default)]
    pub timezone: DisplayTimezone,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub reminders: ReminderConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.reminders.poll_interval_secs == 0 {
            bail!("reminders.poll_interval_secs must be greater than zero");
        }
        if self.storage.lock_timeout_ms == 0 {
            bail!("storage.lock_timeout_ms must be greater than zero");
        }
        if self.storage.path.as_os_str().is_empty() {
            bail!("storage.path must not be empty");
        }
        Ok(())
    }

    /// Storage path with `~/` expanded.
    pub fn storage_path(&self) -> PathBuf {
        expand_home(&self.storage.path, dirs::home_dir().as_deref())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.reminders.poll_interval_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: Duration::from_millis(self.storage.lock_timeout_ms),
        }
    }

    pub fn timezone(&self) -> DisplayTimezone {
        self.display.timezone
    }
}

/// Replace a leading `~` component with `home`. Paths are returned unchanged
/// when there is no home directory.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.storage.lock_timeout_ms, 5000);
        assert_eq!(config.reminders.poll_interval_secs, 60);
        assert!(config.reminders.desktop_notifications);
        assert_eq!(config.display.timezone, DisplayTimezone::Utc);
        assert!(config.storage.path.ends_with("tasks.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str(
            "reminders:\n  poll_interval_secs: 15\ndisplay:\n  timezone: \"+08:00\"\n",
        )
        .unwrap();
        assert_eq!(config.reminders.poll_interval_secs, 15);
        assert!(config.reminders.desktop_notifications);
        assert_eq!(config.display.timezone.to_string(), "+08:00");
        assert_eq!(config.storage.lock_timeout_ms, 5000);
    }

    #[test]
    fn zero_interval_and_timeout_are_rejected() {
        let mut config = Config::default();
        config.reminders.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.lock_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tilde_expands_only_as_leading_component() {
        let home = Path::new("/home/ada");
        assert_eq!(
            expand_home(Path::new("~/.dailytaskreminder/tasks.json"), Some(home)),
            PathBuf::from("/home/ada/.dailytaskreminder/tasks.json")
        );
        assert_eq!(
            expand_home(Path::new("/srv/tasks.json"), Some(home)),
            PathBuf::from("/srv/tasks.json")
        );
        assert_eq!(
            expand_home(Path::new("~/tasks.json"), None),
            PathBuf::from("~/tasks.json")
        );
    }
}
