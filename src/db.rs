//! File-backed storage for the board.
//!
//! The whole board (taxonomy and tasks) lives in one JSON document of shape
//! `{settings, tasks}`, which is also the export format. Writes replace the file
//! atomically; there is no record-level locking, last write wins.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};
use crate::task::Task;
use crate::taxonomy::AppSettings;

/// In-memory copy of the stored board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub settings: AppSettings,
    pub tasks: Vec<Task>,
}

impl Database {
    /// A new board with the starter taxonomy and no tasks.
    pub fn fresh() -> Self {
        Database { settings: AppSettings::starter(), tasks: Vec::new() }
    }

    /// Load from a JSON file, starting a fresh board if the file does not exist.
    pub fn load(path: &Path) -> BoardResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no board file yet, starting fresh");
            return Ok(Database::fresh());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let db: Database = serde_json::from_str(&buf)?;
        if let Err(e) = db.settings.validate() {
            tracing::warn!(error = %e, "stored taxonomy is incomplete");
        }
        Ok(db)
    }

    /// Save to a JSON file via temp file + rename.
    pub fn save(&self, path: &Path) -> BoardResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        tracing::debug!(path = %path.display(), tasks = self.tasks.len(), "board saved");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Swap in an updated version of a task, matched by id.
    pub fn replace(&mut self, task: Task) -> BoardResult<()> {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| BoardError::NotFound { kind: "task", id: task.id.clone() })?;
        *slot = task;
        Ok(())
    }

    /// Delete a task for good.
    pub fn remove(&mut self, id: &str) -> BoardResult<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| BoardError::NotFound { kind: "task", id: id.to_string() })?;
        Ok(self.tasks.remove(idx))
    }

    /// Resolve a task identifier (internal id, or taskid case-insensitively).
    pub fn resolve(&self, identifier: &str) -> BoardResult<&Task> {
        if let Some(task) = self.get(identifier) {
            return Ok(task);
        }
        let wanted = identifier.to_lowercase();
        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.taskid.to_lowercase() == wanted)
            .collect();
        match matches.as_slice() {
            [] => Err(BoardError::NotFound { kind: "task", id: identifier.to_string() }),
            [only] => Ok(*only),
            many => Err(BoardError::AmbiguousTask {
                identifier: identifier.to_string(),
                candidates: many
                    .iter()
                    .map(|t| format!("{} ({})", t.id, t.title))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Copy the board file into a sibling `backup/` directory with a timestamp prefix.
pub fn create_backup(db_path: &Path) -> BoardResult<String> {
    if !db_path.exists() {
        return Err(BoardError::NotFound { kind: "board file", id: db_path.display().to_string() });
    }
    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("board.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, file_name));
    fs::copy(db_path, &backup_path)?;

    Ok(backup_path.to_string_lossy().to_string())
}

/// Truncate a string to a maximum width, adding an ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
