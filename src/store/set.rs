//! In-memory view of the task file for the duration of one transaction.

use crate::error::{TaskError, TaskResult};
use crate::types::{Task, TaskPatch, TaskStatus};
use chrono::{DateTime, Utc};

/// Shortest prefix accepted by [`TaskSet::resolve_prefix`].
pub const MIN_PREFIX_LEN: usize = 4;

/// Tasks in file (insertion) order plus a dirty flag.
///
/// Only methods that actually change something set the flag, so a
/// transaction that turns out to be a no-op does not rewrite the file.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    dirty: bool,
}

impl TaskSet {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> TaskResult<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::task_not_found(id))
    }

    /// Map a possibly truncated id to exactly one task id.
    ///
    /// An exact match always wins. Otherwise the prefix must be at least
    /// [`MIN_PREFIX_LEN`] characters and match a single id; a shorter input
    /// that is not an exact id is simply not found.
    pub fn resolve_prefix(&self, partial: &str) -> TaskResult<String> {
        let partial = partial.trim();
        if partial.is_empty() {
            return Err(TaskError::missing_field("task_id"));
        }
        if self.contains(partial) {
            return Ok(partial.to_string());
        }
        // Too short to be a prefix, and no task has this exact id.
        if partial.chars().count() < MIN_PREFIX_LEN {
            return Err(TaskError::task_not_found(partial));
        }

        let mut matches: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(partial))
            .map(|t| t.id.clone())
            .collect();

        match matches.len() {
            0 => Err(TaskError::task_not_found(partial)),
            1 => Ok(matches.swap_remove(0)),
            _ => Err(TaskError::ambiguous_id(partial, &matches)),
        }
    }

    pub fn insert(&mut self, task: Task) {
        self.tasks.push(task);
        self.dirty = true;
    }

    pub fn remove(&mut self, id: &str) -> TaskResult<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::task_not_found(id))?;
        self.dirty = true;
        Ok(self.tasks.remove(idx))
    }

    /// Apply `patch` to task `id`, enforcing the one-way transitions.
    ///
    /// Returns the task after the update. `updated_at` only moves when a
    /// field actually changed.
    pub fn apply_patch(&mut self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> TaskResult<Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::task_not_found(id))?;

        if task.status == TaskStatus::Completed && patch.status == Some(TaskStatus::Pending) {
            return Err(TaskError::invalid_value(
                "status",
                format!("Task {} is completed and cannot return to pending", id),
            ));
        }
        if task.notified && patch.notified == Some(false) {
            return Err(TaskError::invalid_value(
                "notified",
                format!("Task {} was already notified; notified cannot be reset", id),
            ));
        }

        let mut updated = task.clone();
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(TaskError::invalid_value("title", "title must not be empty"));
            }
            updated.title = title.clone();
        }
        if let Some(description) = &patch.description {
            updated.description = description.clone();
        }
        if let Some(due_at) = patch.due_at {
            updated.due_at = due_at;
        }
        if let Some(remind_at) = patch.remind_at {
            updated.remind_at = remind_at;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(notified) = patch.notified {
            updated.notified = notified;
        }

        if updated != *task {
            updated.updated_at = now;
            *task = updated;
            self.dirty = true;
        }
        Ok(task.clone())
    }
}
