//! Layered configuration.
//!
//! 1. **Defaults** - built in
//! 2. **File** - `--config`, else `$DTR_CONFIG_PATH`, else `~/.dailytaskreminder/config.yaml`
//! 3. **Environment** - see below
//! 4. **Flags** - `--storage`, `--poll-interval`
//!
//! ## Environment Variables
//! - `DTR_CONFIG_PATH` - Explicit config file
//! - `DTR_STORAGE_DIR` - Directory holding `tasks.json`
//! - `DTR_POLL_INTERVAL` - Reminder poll interval in seconds
//! - `DTR_TIMEZONE` - Display timezone (`UTC`, `local`, `+08:00`)
//! - `DTR_LOCK_TIMEOUT_MS` - Cross-process lock timeout

mod loader;
mod types;

pub use loader::{CliOverrides, ConfigLoader, ConfigPaths};
pub use loader::{ENV_CONFIG_PATH, ENV_LOCK_TIMEOUT_MS, ENV_POLL_INTERVAL, ENV_STORAGE_DIR, ENV_TIMEZONE};
pub use types::*;
