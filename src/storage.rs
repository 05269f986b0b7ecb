use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::error::Result;
use crate::models::Task;

/// Serializes read-modify-write cycles within this process.
static STORE_LOCK: Mutex<()> = Mutex::new(());

/// Returns the path to the task store (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `TASKS_DB` environment variable.
/// 2. `~/.local/share/tideline/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
pub fn db_path() -> PathBuf {
    std::env::var("TASKS_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("tideline");
        p.push("tasks.json");
        p
    })
}

/// Loads all tasks from the store.
///
/// A missing file is an empty store. A file that exists but does not parse
/// is an error, so a later save cannot silently wipe it.
pub fn load_tasks() -> Result<Vec<Task>> {
    let path = db_path();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "task store missing, starting empty");
        return Ok(Vec::new());
    }
    let s = fs::read_to_string(&path)?;
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tasks: Vec<Task> = serde_json::from_str(&s)?;
    tracing::debug!(path = %path.display(), count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

/// Replaces the store with `tasks`.
///
/// Writes to a sibling temp file and renames it over the store, so readers
/// never observe a half-written file.
pub fn save_tasks(tasks: &[Task]) -> Result<()> {
    let path = db_path();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let s = serde_json::to_string_pretty(tasks)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(s.as_bytes())?;
    tmp.flush()?;
    tmp.persist(&path).map_err(|e| e.error)?;
    tracing::debug!(path = %path.display(), count = tasks.len(), "saved tasks");
    Ok(())
}

/// Reloads the store, applies `f`, and saves the result.
///
/// The store is written only when `f` succeeds. Reloading immediately before
/// the mutation keeps records written by other sessions since our last read.
pub fn update_tasks<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&mut Vec<Task>) -> Result<T>,
{
    let _guard = STORE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut tasks = load_tasks()?;
    let out = f(&mut tasks)?;
    save_tasks(&tasks)?;
    Ok(out)
}

/// Deletes the task store file.
pub fn delete_database() -> Result<()> {
    let path = db_path();
    if path.exists() {
        fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "task store deleted");
    }
    Ok(())
}
