//! Whole-file JSON persistence.
//!
//! The task file is read in full and rewritten in full. Writes go to a
//! sibling temp file that is fsynced and renamed over the original, so a
//! reader sees either the old snapshot or the new one.

use crate::error::{TaskError, TaskResult};
use crate::types::Task;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Load every task from `path`. A zero-length file is an empty store.
pub fn load_tasks(path: &Path) -> TaskResult<Vec<Task>> {
    let bytes = std::fs::read(path).map_err(|e| {
        TaskError::storage(format!("failed to read task file {}: {}", path.display(), e))
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        TaskError::storage(format!(
            "failed to parse task file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Atomically replace `path` with `tasks`.
pub fn persist_tasks(path: &Path, tasks: &[Task]) -> TaskResult<()> {
    let mut json = serde_json::to_vec_pretty(tasks)
        .map_err(|e| TaskError::storage(format!("failed to serialize tasks: {}", e)))?;
    json.push(b'\n');

    let tmp_path = temp_path(path);
    let write_result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(TaskError::storage(format!(
            "failed to write temp file {}: {}",
            tmp_path.display(),
            e
        )));
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        TaskError::storage(format!(
            "failed to rename temp file to {}: {}",
            path.display(),
            e
        ))
    })
}

/// `tasks.json` -> `tasks.json.tmp`, in the same directory so rename is atomic.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tasks.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Sidecar lock file next to the task file.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tasks.json".into());
    name.push(".lock");
    path.with_file_name(name)
}
