//! Core types for the task store.

use crate::datetime::{DisplayTimezone, parse_instant};
use crate::error::{TaskError, TaskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task status. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(TaskError::invalid_value(
                "status",
                format!("Invalid status '{}'. Must be one of: completed, pending.", other),
            )),
        }
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remind_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Pending with a due time strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.due_at.is_some_and(|due| due < now)
    }

    /// Eligible for reminder delivery: pending, not yet notified, and
    /// `remind_at <= now`. Tasks without `remind_at` are never eligible.
    pub fn is_reminder_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && !self.notified && self.remind_at.is_some_and(|at| at <= now)
    }
}

/// Listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    Pending,
    Completed,
    Overdue,
    All,
}

impl TaskFilter {
    pub const VARIANTS: [TaskFilter; 4] = [
        TaskFilter::All,
        TaskFilter::Completed,
        TaskFilter::Overdue,
        TaskFilter::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
            TaskFilter::Overdue => "overdue",
            TaskFilter::All => "all",
        }
    }

    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::Pending => task.is_pending(),
            TaskFilter::Completed => task.status == TaskStatus::Completed,
            TaskFilter::Overdue => task.is_overdue(now),
            TaskFilter::All => true,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskFilter::VARIANTS
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = TaskFilter::VARIANTS.iter().map(|f| f.as_str()).collect();
                TaskError::invalid_value(
                    "filter",
                    format!("Invalid filter '{}'. Must be one of: {}.", s, valid.join(", ")),
                )
            })
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_remind_at(mut self, remind_at: DateTime<Utc>) -> Self {
        self.remind_at = Some(remind_at);
        self
    }

    /// Build from raw text fields, parsing times in `tz`.
    ///
    /// Blank descriptions and times are treated as absent.
    pub fn parse(
        title: &str,
        description: Option<&str>,
        due_at: Option<&str>,
        remind_at: Option<&str>,
        tz: DisplayTimezone,
    ) -> TaskResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::missing_field("title"));
        }
        Ok(Self {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            due_at: parse_optional_time("due_at", due_at, tz)?,
            remind_at: parse_optional_time("remind_at", remind_at, tz)?,
        })
    }
}

fn parse_optional_time(
    field: &str,
    raw: Option<&str>,
    tz: DisplayTimezone,
) -> TaskResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_instant(value, tz)
            .map(Some)
            .map_err(|reason| TaskError::invalid_value(field, reason)),
        None => Ok(None),
    }
}

/// Whitelisted partial update. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub remind_at: Option<Option<DateTime<Utc>>>,
    pub status: Option<TaskStatus>,
    pub notified: Option<bool>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn mark_notified() -> Self {
        Self {
            notified: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn new_task_rejects_blank_title() {
        let err = NewTask::parse("   ", None, None, None, DisplayTimezone::Utc).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn new_task_rejects_bad_times() {
        let err = NewTask::parse("ok", None, None, Some("soon"), DisplayTimezone::Utc)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("remind_at"));
    }

    #[test]
    fn new_task_trims_and_drops_empty_description() {
        let task = NewTask::parse(" Buy milk ", Some("  "), None, None, DisplayTimezone::Utc)
            .unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(task.description.is_none());
    }

    #[test]
    fn filter_parsing() {
        assert_eq!("Overdue".parse::<TaskFilter>().unwrap(), TaskFilter::Overdue);
        let err = "bad".parse::<TaskFilter>().unwrap_err();
        assert!(err.message.contains("all, completed, overdue, pending"));
    }

    #[test]
    fn reminder_eligibility() {
        let now = Utc::now();
        let mut task = Task {
            id: "abcd1234".into(),
            title: "t".into(),
            description: None,
            due_at: None,
            remind_at: None,
            status: TaskStatus::Pending,
            notified: false,
            created_at: now,
            updated_at: now,
        };
        assert!(!task.is_reminder_due(now));

        task.remind_at = Some(now);
        assert!(task.is_reminder_due(now));

        task.notified = true;
        assert!(!task.is_reminder_due(now));

        task.notified = false;
        task.status = TaskStatus::Completed;
        assert!(!task.is_reminder_due(now));
    }
}
