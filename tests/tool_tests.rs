//! Integration tests for the tools and the router envelope.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use task_reminder::datetime::DisplayTimezone;
use task_reminder::error::ErrorCode;
use task_reminder::store::TaskStore;
use task_reminder::tools::{ResponseStatus, ToolRequest, ToolResponse, ToolRouter};
use task_reminder::types::{NewTask, TaskFilter};
use tempfile::TempDir;

/// Router over a fresh store. Keep the `TempDir` alive.
fn setup_router() -> (TempDir, Arc<TaskStore>, ToolRouter) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(TaskStore::open(temp.path().join("tasks.json")).expect("Failed to open store"));
    let router = ToolRouter::standard(Arc::clone(&store), DisplayTimezone::Utc);
    (temp, store, router)
}

fn call(router: &ToolRouter, tool: &str, payload: Value) -> ToolResponse {
    router.dispatch(ToolRequest::new("req-1", tool, payload))
}

fn ok(resp: ToolResponse) -> Value {
    assert_eq!(resp.status, ResponseStatus::Success, "unexpected error: {:?}", resp);
    resp.result.expect("success without result")
}

fn err_code(resp: &ToolResponse) -> ErrorCode {
    assert_eq!(resp.status, ResponseStatus::Error, "expected error: {:?}", resp);
    assert!(resp.result.is_none());
    resp.code.expect("error without code")
}

fn add(router: &ToolRouter, title: &str) -> String {
    let task = ok(call(router, "addtask", json!({ "title": title })));
    task["id"].as_str().unwrap().to_string()
}

mod router_tests {
    use super::*;

    #[test]
    fn standard_router_registers_five_tools_in_order() {
        let (_temp, _store, router) = setup_router();
        assert_eq!(
            router.tool_names(),
            ["addtask", "listtasks", "completetask", "deletetask", "checkreminders"]
        );
        let defs = router.definitions();
        assert_eq!(defs.len(), 5);
        assert_eq!(defs[0].name, "addtask");
    }

    #[test]
    fn unknown_tool_is_an_error_envelope() {
        let (_temp, _store, router) = setup_router();
        let resp = router.dispatch(ToolRequest::new("abc", "snooze", json!({})));
        assert_eq!(resp.id, "abc");
        assert_eq!(err_code(&resp), ErrorCode::UnknownTool);
        assert_eq!(resp.error.as_deref(), Some("Unknown tool: snooze"));
    }

    #[test]
    fn request_id_is_echoed_on_success() {
        let (_temp, _store, router) = setup_router();
        let resp = router.dispatch(ToolRequest::new("corr-42", "listtasks", Value::Null));
        assert_eq!(resp.id, "corr-42");
        assert!(resp.is_success());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let (_temp, _store, router) = setup_router();
        assert_eq!(
            err_code(&call(&router, "addtask", json!("Buy milk"))),
            ErrorCode::ValidationError
        );
    }
}

mod addtask_tests {
    use super::*;

    #[test]
    fn add_returns_the_stored_task() {
        let (_temp, store, router) = setup_router();
        let task = ok(call(
            &router,
            "addtask",
            json!({
                "title": "Call mom",
                "description": "birthday",
                "due_at": "2030-05-01 18:00",
                "remind_at": "2030-05-01T17:30:00+02:00"
            }),
        ));

        assert_eq!(task["title"], "Call mom");
        assert_eq!(task["description"], "birthday");
        assert_eq!(task["status"], "pending");
        assert_eq!(task["notified"], false);

        let due: DateTime<Utc> = serde_json::from_value(task["due_at"].clone()).unwrap();
        assert_eq!(due.to_rfc3339(), "2030-05-01T18:00:00+00:00");
        let remind: DateTime<Utc> = serde_json::from_value(task["remind_at"].clone()).unwrap();
        assert_eq!(remind.to_rfc3339(), "2030-05-01T15:30:00+00:00");

        let stored = store.get(task["id"].as_str().unwrap()).unwrap();
        assert_eq!(serde_json::to_value(&stored).unwrap(), task);
    }

    #[test]
    fn missing_or_blank_title_never_reaches_storage() {
        let (_temp, store, router) = setup_router();
        for payload in [json!({}), json!({"title": "  "}), json!({"title": 7})] {
            assert_eq!(err_code(&call(&router, "addtask", payload)), ErrorCode::ValidationError);
        }
        assert!(store.list(TaskFilter::All).unwrap().is_empty());
    }

    #[test]
    fn unparseable_time_names_the_field() {
        let (_temp, _store, router) = setup_router();
        let resp = call(&router, "addtask", json!({"title": "x", "remind_at": "tomorrow-ish"}));
        assert_eq!(err_code(&resp), ErrorCode::ValidationError);
        assert!(resp.error.unwrap().contains("tomorrow-ish"));
    }

    #[test]
    fn naive_times_use_the_display_timezone() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(TaskStore::open(temp.path().join("tasks.json")).unwrap());
        let tz: DisplayTimezone = "+08:00".parse().unwrap();
        let router = ToolRouter::standard(store, tz);

        let task = ok(call(&router, "addtask", json!({"title": "x", "due_at": "2030-01-02 09:00"})));
        let due: DateTime<Utc> = serde_json::from_value(task["due_at"].clone()).unwrap();
        assert_eq!(due.to_rfc3339(), "2030-01-02T01:00:00+00:00");
    }
}

mod listtasks_tests {
    use super::*;

    #[test]
    fn default_filter_is_pending() {
        let (_temp, _store, router) = setup_router();
        add(&router, "a");
        let done = add(&router, "b");
        ok(call(&router, "completetask", json!({ "task_id": done })));

        let result = ok(call(&router, "listtasks", json!({})));
        assert_eq!(result["filter"], "pending");
        assert_eq!(result["count"], 1);
        assert_eq!(result["tasks"][0]["title"], "a");

        let all = ok(call(&router, "listtasks", json!({"filter": "all"})));
        assert_eq!(all["count"], 2);
    }

    #[test]
    fn overdue_filter() {
        let (_temp, store, router) = setup_router();
        store
            .create(NewTask::new("late").with_due_at(Utc::now() - ChronoDuration::hours(2)))
            .unwrap();
        store
            .create(NewTask::new("fine").with_due_at(Utc::now() + ChronoDuration::hours(2)))
            .unwrap();

        let result = ok(call(&router, "listtasks", json!({"filter": "overdue"})));
        assert_eq!(result["count"], 1);
        assert_eq!(result["tasks"][0]["title"], "late");
    }

    #[test]
    fn invalid_filter_lists_choices() {
        let (_temp, _store, router) = setup_router();
        let resp = call(&router, "listtasks", json!({"filter": "someday"}));
        assert_eq!(err_code(&resp), ErrorCode::ValidationError);
        assert!(resp.error.unwrap().contains("all, completed, overdue, pending"));
    }
}

mod completetask_tests {
    use super::*;

    #[test]
    fn complete_by_prefix_is_idempotent() {
        let (_temp, _store, router) = setup_router();
        let id = add(&router, "once");

        let first = ok(call(&router, "completetask", json!({ "task_id": &id[..5] })));
        assert_eq!(first["status"], "completed");

        let second = ok(call(&router, "completetask", json!({ "task_id": id })));
        assert_eq!(second, first);
    }

    #[test]
    fn missing_task_id_is_a_validation_error() {
        let (_temp, _store, router) = setup_router();
        assert_eq!(err_code(&call(&router, "completetask", json!({}))), ErrorCode::ValidationError);
        assert_eq!(
            err_code(&call(&router, "completetask", json!({"task_id": " "}))),
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn short_unknown_id_is_not_found() {
        let (_temp, _store, router) = setup_router();
        add(&router, "something");
        assert_eq!(
            err_code(&call(&router, "completetask", json!({"task_id": "ab"}))),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_temp, _store, router) = setup_router();
        assert_eq!(
            err_code(&call(&router, "completetask", json!({"task_id": "0000ffff"}))),
            ErrorCode::NotFound
        );
    }
}

mod deletetask_tests {
    use super::*;

    #[test]
    fn delete_returns_deleted_task() {
        let (_temp, store, router) = setup_router();
        let id = add(&router, "gone");

        let result = ok(call(&router, "deletetask", json!({ "task_id": &id[..8] })));
        assert_eq!(result["deleted"]["id"], id.as_str());
        assert_eq!(store.get(&id).unwrap_err().code, ErrorCode::NotFound);
    }

    #[test]
    fn short_id_on_empty_store_is_not_found() {
        let (_temp, _store, router) = setup_router();
        assert_eq!(
            err_code(&call(&router, "deletetask", json!({"task_id": "xyz"}))),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn deleting_twice_is_not_found() {
        let (_temp, _store, router) = setup_router();
        let id = add(&router, "gone");
        ok(call(&router, "deletetask", json!({ "task_id": &id })));
        assert_eq!(
            err_code(&call(&router, "deletetask", json!({ "task_id": &id }))),
            ErrorCode::NotFound
        );
    }
}

mod checkreminders_tests {
    use super::*;

    #[test]
    fn lists_due_reminders_without_marking_them() {
        let (_temp, store, router) = setup_router();
        let due = store
            .create(NewTask::new("now").with_remind_at(Utc::now() - ChronoDuration::seconds(1)))
            .unwrap();
        store
            .create(NewTask::new("later").with_remind_at(Utc::now() + ChronoDuration::hours(1)))
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        for _ in 0..2 {
            let result = ok(call(&router, "checkreminders", Value::Null));
            assert_eq!(result["count"], 1);
            assert_eq!(result["tasks"][0]["id"], due.id.as_str());
        }

        assert!(!store.get(&due.id).unwrap().notified);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }
}
