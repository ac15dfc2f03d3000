//! Reminder inspection tool.

use super::{Tool, payload_object};
use crate::error::TaskResult;
use crate::store::TaskStore;
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

/// `checkreminders`: tasks whose reminder is due and not yet delivered.
///
/// Read-only. Setting `notified` belongs to the scheduler alone.
pub struct CheckReminders {
    store: Arc<TaskStore>,
}

impl CheckReminders {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

impl Tool for CheckReminders {
    type Args = ();

    const NAME: &'static str = "checkreminders";
    const DESCRIPTION: &'static str =
        "List pending tasks whose reminder time has passed and that have not been notified yet.";

    fn input_schema(&self) -> (Value, Vec<&'static str>) {
        (json!({}), vec![])
    }

    fn validate(&self, payload: &Value) -> TaskResult<()> {
        payload_object(payload).map(|_| ())
    }

    fn handle(&self, _args: ()) -> TaskResult<Value> {
        let due = self.store.due_reminders(Utc::now())?;
        Ok(json!({
            "count": due.len(),
            "tasks": due
        }))
    }
}
