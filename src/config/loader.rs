//! Configuration loader with tier-based merging.
//!
//! Tiers, lowest to highest: built-in defaults, one YAML file, environment
//! variables, command-line flags. YAML is merged into the defaults field by
//! field, so a file only needs the keys it changes.

use super::types::{APP_DIR, Config, TASKS_FILE};
use crate::datetime::DisplayTimezone;
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit config file path.
pub const ENV_CONFIG_PATH: &str = "DTR_CONFIG_PATH";
/// Directory holding `tasks.json`.
pub const ENV_STORAGE_DIR: &str = "DTR_STORAGE_DIR";
/// Poll interval in seconds.
pub const ENV_POLL_INTERVAL: &str = "DTR_POLL_INTERVAL";
pub const ENV_TIMEZONE: &str = "DTR_TIMEZONE";
pub const ENV_LOCK_TIMEOUT_MS: &str = "DTR_LOCK_TIMEOUT_MS";

/// Where to look for the YAML tier.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `--config` or `$DTR_CONFIG_PATH`. Must exist when set.
    pub explicit: Option<PathBuf>,
    /// `~/.dailytaskreminder`; `config.yaml` inside it is optional.
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover paths from the flag, the environment and the home directory.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let explicit = explicit.or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));
        Self {
            explicit,
            user_dir: dirs::home_dir().map(|h| h.join(APP_DIR)),
        }
    }

    /// The YAML file to load, if any.
    pub fn config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        self.user_dir
            .as_ref()
            .map(|dir| dir.join("config.yaml"))
            .filter(|file| file.exists())
    }
}

/// Command-line tier.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub storage: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: Config,
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load every tier using the real process environment.
    pub fn load(paths: ConfigPaths, overrides: &CliOverrides) -> Result<Self> {
        Self::load_with_env(paths, overrides, |key| std::env::var(key).ok())
    }

    /// Load every tier, reading environment variables through `env`.
    pub fn load_with_env<F>(paths: ConfigPaths, overrides: &CliOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layers = vec![serde_json::to_value(Config::default())?];

        let config_path = paths.config_file();
        if let Some(file) = &config_path {
            layers.push(read_yaml(file)?);
            debug!(path = %file.display(), "Loaded config file");
        }

        let merged = layers.into_iter().fold(Value::Null, overlay);
        let mut config: Config =
            serde_json::from_value(merged).context("invalid configuration")?;

        apply_env_overrides(&mut config, env)?;

        if let Some(storage) = &overrides.storage {
            config.storage.path = storage.clone();
        }
        if let Some(secs) = overrides.poll_interval_secs {
            config.reminders.poll_interval_secs = secs;
        }

        config.validate()?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// The YAML file that was merged, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
}

/// Merge `layer` over `base`. Objects merge per key; anything else in
/// `layer` replaces `base`, except `null` which leaves it alone.
fn overlay(base: Value, layer: Value) -> Value {
    match (base, layer) {
        (Value::Object(mut base), Value::Object(layer)) => {
            for (key, value) in layer {
                let merged = match base.remove(&key) {
                    Some(existing) => overlay(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, layer) => layer,
    }
}

fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = env(ENV_STORAGE_DIR).filter(|d| !d.is_empty()) {
        config.storage.path = PathBuf::from(dir).join(TASKS_FILE);
    }

    if let Some(raw) = env(ENV_POLL_INTERVAL) {
        config.reminders.poll_interval_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", ENV_POLL_INTERVAL, raw))?;
    }

    if let Some(raw) = env(ENV_TIMEZONE) {
        config.display.timezone = raw
            .parse::<DisplayTimezone>()
            .map_err(|e| anyhow!("{}: {}", ENV_TIMEZONE, e))?;
    }

    if let Some(raw) = env(ENV_LOCK_TIMEOUT_MS) {
        config.storage.lock_timeout_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of milliseconds, got '{}'", ENV_LOCK_TIMEOUT_MS, raw))?;
    }

    Ok(())
}
