//! Diagnostic logging setup.
//!
//! Reminders themselves are not log lines; they go through
//! [`crate::scheduler::Notifier`]. This module only wires `tracing` output.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where diagnostic logs go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    Off,
    Stdout,
    #[default]
    Stderr,
    /// Append to a file, without ANSI colours.
    File(PathBuf),
}

impl FromStr for LogOutput {
    type Err = std::convert::Infallible;

    /// `0`/`off`, `1`/`stdout`, `2`/`stderr`, anything else is a file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" | "off" => LogOutput::Off,
            "1" | "stdout" => LogOutput::Stdout,
            "2" | "stderr" => LogOutput::Stderr,
            file => LogOutput::File(PathBuf::from(file)),
        })
    }
}

/// Filter from `RUST_LOG` when set, else `info` (or `debug` when verbose).
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

/// Install the global subscriber. Call once, at startup.
pub fn init(output: &LogOutput, verbose: bool) -> Result<()> {
    match output {
        LogOutput::Off => {}
        LogOutput::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_targets() {
        assert_eq!("off".parse::<LogOutput>().unwrap(), LogOutput::Off);
        assert_eq!("1".parse::<LogOutput>().unwrap(), LogOutput::Stdout);
        assert_eq!("stderr".parse::<LogOutput>().unwrap(), LogOutput::Stderr);
        assert_eq!(
            "dtr.log".parse::<LogOutput>().unwrap(),
            LogOutput::File(PathBuf::from("dtr.log"))
        );
    }
}
