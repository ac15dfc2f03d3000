//! CLI command definitions for task-reminder.
//!
//! Every task command is turned into a [`ToolRequest`] and dispatched through
//! the same router the MCP server uses.

use crate::config::CliOverrides;
use crate::logging::LogOutput;
use crate::tools::ToolRequest;
use crate::types::TaskFilter;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// Daily task reminder: MCP server, reminder daemon and task CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the task file (overrides config)
    #[arg(short, long, global = true)]
    pub storage: Option<PathBuf>,

    /// Seconds between reminder polls (overrides config)
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: LogOutput,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            storage: self.storage.clone(),
            poll_interval_secs: self.poll_interval,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the MCP server on stdio with the reminder scheduler (default)
    Serve,

    /// Run only the reminder scheduler until interrupted
    Watch,

    /// Add a task
    Add {
        /// Task title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Longer description
        #[arg(short, long)]
        desc: Option<String>,

        /// Due time, e.g. "2025-06-01 17:00" or RFC 3339
        #[arg(long)]
        due: Option<String>,

        /// Reminder time, same formats as --due
        #[arg(short, long)]
        remind: Option<String>,
    },

    /// List tasks
    List {
        /// pending, completed, overdue or all
        #[arg(short, long, default_value = "pending")]
        filter: TaskFilter,
    },

    /// Mark a task completed
    Complete {
        /// Task id or unique prefix (at least 4 characters)
        task_id: String,
    },

    /// Delete a task
    Delete {
        /// Task id or unique prefix (at least 4 characters)
        task_id: String,
    },

    /// Show reminders that are due but not yet delivered
    Check,
}

impl Command {
    /// The router request for a task command, or `None` for `serve`/`watch`.
    pub fn to_request(&self, id: impl Into<String>) -> Option<ToolRequest> {
        let (tool, payload) = match self {
            Command::Serve | Command::Watch => return None,
            Command::Add {
                title,
                desc,
                due,
                remind,
            } => {
                let mut payload = Map::new();
                payload.insert("title".into(), json!(title.join(" ")));
                for (key, value) in [("description", desc), ("due_at", due), ("remind_at", remind)] {
                    if let Some(value) = value {
                        payload.insert(key.into(), json!(value));
                    }
                }
                ("addtask", Value::Object(payload))
            }
            Command::List { filter } => ("listtasks", json!({ "filter": filter.as_str() })),
            Command::Complete { task_id } => ("completetask", json!({ "task_id": task_id })),
            Command::Delete { task_id } => ("deletetask", json!({ "task_id": task_id })),
            Command::Check => ("checkreminders", json!({})),
        };
        Some(ToolRequest::new(id, tool, payload))
    }
}
