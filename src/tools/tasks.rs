//! Task CRUD tools.

use super::{Tool, get_string, payload_object, require_string};
use crate::datetime::DisplayTimezone;
use crate::error::TaskResult;
use crate::store::TaskStore;
use crate::types::{NewTask, TaskFilter};
use serde_json::{Value, json};
use std::sync::Arc;

/// `addtask`: create a task.
pub struct AddTask {
    store: Arc<TaskStore>,
    timezone: DisplayTimezone,
}

impl AddTask {
    pub fn new(store: Arc<TaskStore>, timezone: DisplayTimezone) -> Self {
        Self { store, timezone }
    }
}

impl Tool for AddTask {
    type Args = NewTask;

    const NAME: &'static str = "addtask";
    const DESCRIPTION: &'static str =
        "Add a new task with a title, optional description, due time and reminder time.";

    fn input_schema(&self) -> (Value, Vec<&'static str>) {
        (
            json!({
                "title": {
                    "type": "string",
                    "description": "Task title"
                },
                "description": {
                    "type": "string",
                    "description": "Task description"
                },
                "due_at": {
                    "type": "string",
                    "description": "Due time (ISO-8601, or 'YYYY-MM-DD HH:MM' in the display timezone)"
                },
                "remind_at": {
                    "type": "string",
                    "description": "When to deliver the reminder (same formats as due_at)"
                }
            }),
            vec!["title"],
        )
    }

    fn validate(&self, payload: &Value) -> TaskResult<NewTask> {
        let args = payload_object(payload)?;
        let title = require_string(&args, "title")?;
        let description = get_string(&args, "description")?;
        let due_at = get_string(&args, "due_at")?;
        let remind_at = get_string(&args, "remind_at")?;

        NewTask::parse(
            &title,
            description.as_deref(),
            due_at.as_deref(),
            remind_at.as_deref(),
            self.timezone,
        )
    }

    fn handle(&self, args: NewTask) -> TaskResult<Value> {
        let task = self.store.create(args)?;
        Ok(json!(task))
    }
}

/// `listtasks`: list tasks by filter.
pub struct ListTasks {
    store: Arc<TaskStore>,
}

impl ListTasks {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

impl Tool for ListTasks {
    type Args = TaskFilter;

    const NAME: &'static str = "listtasks";
    const DESCRIPTION: &'static str = "List tasks, oldest first, filtered by status.";

    fn input_schema(&self) -> (Value, Vec<&'static str>) {
        (
            json!({
                "filter": {
                    "type": "string",
                    "enum": ["pending", "completed", "overdue", "all"],
                    "description": "Which tasks to list (default: pending)"
                }
            }),
            vec![],
        )
    }

    fn validate(&self, payload: &Value) -> TaskResult<TaskFilter> {
        let args = payload_object(payload)?;
        match get_string(&args, "filter")? {
            Some(raw) => raw.parse(),
            None => Ok(TaskFilter::default()),
        }
    }

    fn handle(&self, filter: TaskFilter) -> TaskResult<Value> {
        let tasks = self.store.list(filter)?;
        Ok(json!({
            "filter": filter.as_str(),
            "count": tasks.len(),
            "tasks": tasks
        }))
    }
}

/// `completetask`: mark a task completed by full or partial id.
pub struct CompleteTask {
    store: Arc<TaskStore>,
}

impl CompleteTask {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

impl Tool for CompleteTask {
    type Args = String;

    const NAME: &'static str = "completetask";
    const DESCRIPTION: &'static str =
        "Mark a task as completed. Accepts a full id or a unique prefix of at least 4 characters.";

    fn input_schema(&self) -> (Value, Vec<&'static str>) {
        (
            json!({
                "task_id": {
                    "type": "string",
                    "description": "Task id or unique id prefix"
                }
            }),
            vec!["task_id"],
        )
    }

    fn validate(&self, payload: &Value) -> TaskResult<String> {
        require_string(&payload_object(payload)?, "task_id")
    }

    fn handle(&self, task_id: String) -> TaskResult<Value> {
        let task = self.store.complete_by_prefix(&task_id)?;
        Ok(json!(task))
    }
}

/// `deletetask`: permanently delete a task by full or partial id.
pub struct DeleteTask {
    store: Arc<TaskStore>,
}

impl DeleteTask {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

impl Tool for DeleteTask {
    type Args = String;

    const NAME: &'static str = "deletetask";
    const DESCRIPTION: &'static str =
        "Delete a task permanently. Accepts a full id or a unique prefix of at least 4 characters.";

    fn input_schema(&self) -> (Value, Vec<&'static str>) {
        (
            json!({
                "task_id": {
                    "type": "string",
                    "description": "Task id or unique id prefix"
                }
            }),
            vec!["task_id"],
        )
    }

    fn validate(&self, payload: &Value) -> TaskResult<String> {
        require_string(&payload_object(payload)?, "task_id")
    }

    fn handle(&self, task_id: String) -> TaskResult<Value> {
        let task = self.store.delete_by_prefix(&task_id)?;
        Ok(json!({ "deleted": task }))
    }
}
