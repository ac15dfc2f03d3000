//! File-backed task store.
//!
//! `TaskStore` owns every read-modify-write against the task file. Each
//! operation is one short transaction:
//!
//! 1. take the in-process mutex (serialises threads sharing this store),
//! 2. for writes, take the advisory lock on `<file>.lock` (serialises processes),
//! 3. load the whole file, apply the change in memory,
//! 4. persist through temp file + rename, release both locks.
//!
//! Nothing is cached between transactions; the file is the source of truth.

pub mod file;
pub mod lock;
mod set;

pub use lock::FileLock;
pub use set::{MIN_PREFIX_LEN, TaskSet};

use crate::error::{TaskError, TaskResult};
use crate::types::{NewTask, Task, TaskFilter, TaskPatch, TaskStatus};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Default bound on waiting for the cross-process lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Store tuning knobs.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Durable mapping of task ids to tasks, backed by one JSON file.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    lock_path: PathBuf,
    options: StoreOptions,
    guard: Mutex<()>,
}

impl TaskStore {
    /// Open the store at `path`, creating the directory and an empty file
    /// if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> TaskResult<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: StoreOptions) -> TaskResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                TaskError::storage(format!(
                    "failed to create storage directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let store = Self {
            lock_path: file::lock_path(&path),
            path,
            options,
            guard: Mutex::new(()),
        };

        {
            let _guard = store.guard.lock().unwrap_or_else(PoisonError::into_inner);
            let _lock = FileLock::acquire(&store.lock_path, store.options.lock_timeout)?;
            if !store.path.exists() {
                file::persist_tasks(&store.path, &[])?;
                info!(path = %store.path.display(), "Created task file");
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `f` against a fresh snapshot without taking the cross-process lock.
    ///
    /// Writers replace the file by rename, so the snapshot is always whole.
    pub fn read<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&TaskSet) -> TaskResult<T>,
    {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let set = TaskSet::new(file::load_tasks(&self.path)?);
        f(&set)
    }

    /// Run a read-modify-write transaction.
    ///
    /// If `f` fails nothing is written. If `f` leaves the set unchanged the
    /// file is not rewritten.
    pub fn transact<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&mut TaskSet) -> TaskResult<T>,
    {
        let started = Instant::now();
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = FileLock::acquire(&self.lock_path, self.options.lock_timeout)?;

        let mut set = TaskSet::new(file::load_tasks(&self.path)?);
        let out = f(&mut set)?;
        if set.is_dirty() {
            file::persist_tasks(&self.path, set.tasks())?;
            debug!(
                tasks = set.tasks().len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Persisted task file"
            );
        }
        Ok(out)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Create a task with a fresh id, `pending`, not notified.
    pub fn create(&self, input: NewTask) -> TaskResult<Task> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(TaskError::missing_field("title"));
        }

        let task = self.transact(|set| {
            let now = Utc::now();
            let task = Task {
                id: fresh_id(set),
                title,
                description: input.description,
                due_at: input.due_at,
                remind_at: input.remind_at,
                status: TaskStatus::Pending,
                notified: false,
                created_at: now,
                updated_at: now,
            };
            set.insert(task.clone());
            Ok(task)
        })?;

        info!(task_id = %task.id, title = %task.title, "Task created");
        Ok(task)
    }

    /// Fetch a task by its full id.
    pub fn get(&self, id: &str) -> TaskResult<Task> {
        self.read(|set| set.get(id).cloned())
    }

    /// Fetch a task by a unique id prefix.
    pub fn resolve_prefix(&self, partial_id: &str) -> TaskResult<Task> {
        self.read(|set| {
            let id = set.resolve_prefix(partial_id)?;
            set.get(&id).cloned()
        })
    }

    /// Tasks matching `filter`, oldest first.
    pub fn list(&self, filter: TaskFilter) -> TaskResult<Vec<Task>> {
        self.list_at(filter, Utc::now())
    }

    /// [`TaskStore::list`] with an explicit clock, for the `overdue` filter.
    pub fn list_at(&self, filter: TaskFilter, now: DateTime<Utc>) -> TaskResult<Vec<Task>> {
        self.read(|set| {
            let mut tasks: Vec<Task> = set
                .tasks()
                .iter()
                .filter(|t| filter.matches(t, now))
                .cloned()
                .collect();
            // Stable: ties keep file order.
            tasks.sort_by_key(|t| t.created_at);
            Ok(tasks)
        })
    }

    /// Pending, unnotified tasks with `remind_at <= now`, earliest reminder first.
    pub fn due_reminders(&self, now: DateTime<Utc>) -> TaskResult<Vec<Task>> {
        self.read(|set| {
            let mut due: Vec<Task> = set
                .tasks()
                .iter()
                .filter(|t| t.is_reminder_due(now))
                .cloned()
                .collect();
            due.sort_by_key(|t| (t.remind_at, t.created_at));
            Ok(due)
        })
    }

    /// Apply a whitelisted patch to task `id`.
    pub fn update(&self, id: &str, patch: TaskPatch) -> TaskResult<Task> {
        self.transact(|set| set.apply_patch(id, &patch, Utc::now()))
    }

    /// Permanently remove task `id`, returning it.
    pub fn delete(&self, id: &str) -> TaskResult<Task> {
        let removed = self.transact(|set| set.remove(id))?;
        info!(task_id = %removed.id, "Task deleted");
        Ok(removed)
    }

    /// Resolve `partial_id` and mark the task completed, in one transaction.
    ///
    /// Completing an already completed task returns it unchanged.
    pub fn complete_by_prefix(&self, partial_id: &str) -> TaskResult<Task> {
        let task = self.transact(|set| {
            let id = set.resolve_prefix(partial_id)?;
            set.apply_patch(&id, &TaskPatch::status(TaskStatus::Completed), Utc::now())
        })?;
        info!(task_id = %task.id, "Task completed");
        Ok(task)
    }

    /// Resolve `partial_id` and delete the task, in one transaction.
    pub fn delete_by_prefix(&self, partial_id: &str) -> TaskResult<Task> {
        let removed = self.transact(|set| {
            let id = set.resolve_prefix(partial_id)?;
            set.remove(&id)
        })?;
        info!(task_id = %removed.id, "Task deleted");
        Ok(removed)
    }

    /// Take ownership of task `id`'s reminder.
    ///
    /// Re-checks eligibility against the file under the cross-process lock
    /// and sets `notified` in the same transaction. Returns `None` when the
    /// task is no longer due at `now`, for example because another process
    /// claimed it first. Only the caller that gets `Some` may deliver.
    pub fn claim_reminder(&self, id: &str, now: DateTime<Utc>) -> TaskResult<Option<Task>> {
        self.transact(|set| {
            if !set.get(id)?.is_reminder_due(now) {
                return Ok(None);
            }
            set.apply_patch(id, &TaskPatch::mark_notified(), Utc::now()).map(Some)
        })
    }
}

/// UUID v4 as 32 hex chars, regenerated on the (theoretical) clash with a
/// live id.
fn fresh_id(set: &TaskSet) -> String {
    loop {
        let id = Uuid::new_v4().simple().to_string();
        if !set.contains(&id) {
            return id;
        }
    }
}
