//! Daily Task Reminder Library
//!
//! A JSON-file task store, the tools that operate on it, a name-based tool
//! router, and a background scheduler that delivers each due reminder once.

pub mod cli;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod tools;
pub mod types;
