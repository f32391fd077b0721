//! Task record and the rules that keep its derived fields consistent.
//!
//! A task holds plain string references into the taxonomy (`status`, `sub_status`,
//! `importance`, `bid_origin`). None of them are checked against the taxonomy on
//! write; a reference that resolves to nothing is a stale but valid state.
//!
//! `completion_date` is never user input. It is derived from status transitions:
//!
//! | previous status | new status     | completion date                 |
//! |-----------------|----------------|---------------------------------|
//! | not completion  | completion     | set to `now` unless already set |
//! | completion      | completion     | kept (first transition wins)    |
//! | completion      | not completion | cleared                         |
//! | not completion  | not completion | kept                            |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CompletionCategory;
use crate::error::{BoardError, BoardResult};
use crate::taxonomy::fresh_id;

/// A single item on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub taskid: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub sub_status: String,
    pub importance: String,
    pub bid_origin: String,
    pub desc: String,
    pub remarks: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
}

/// Fields supplied when a task is first entered.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub taskid: String,
    pub title: String,
    /// Defaults to the creation instant.
    pub date: Option<DateTime<Utc>>,
    /// Defaults to the creation instant.
    pub due_date: Option<DateTime<Utc>>,
    pub status: String,
    pub sub_status: Option<String>,
    pub importance: String,
    pub bid_origin: String,
    pub desc: Option<String>,
    pub remarks: Option<String>,
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub taskid: Option<String>,
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub sub_status: Option<String>,
    pub importance: Option<String>,
    pub bid_origin: Option<String>,
    pub desc: Option<String>,
    pub remarks: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.taskid.is_none()
            && self.title.is_none()
            && self.date.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.sub_status.is_none()
            && self.importance.is_none()
            && self.bid_origin.is_none()
            && self.desc.is_none()
            && self.remarks.is_none()
    }
}

impl Task {
    pub fn is_done(&self, completion: &CompletionCategory) -> bool {
        completion.matches(&self.status)
    }

    fn validate(&self) -> BoardResult<()> {
        require("title", &self.title)?;
        require("taskid", &self.taskid)?;
        require("status", &self.status)?;
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> BoardResult<()> {
    if value.trim().is_empty() {
        return Err(BoardError::MissingField { field });
    }
    Ok(())
}

/// Completion date after a status write.
fn settle_completion(
    previous: Option<DateTime<Utc>>,
    was_done: bool,
    is_done: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (was_done, is_done) {
        (_, true) => previous.or(Some(now)),
        (true, false) => None,
        (false, false) => previous,
    }
}

/// Build a new task from user input, assigning a fresh id.
pub fn create_task(
    input: TaskInput,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> BoardResult<Task> {
    let completion_date = completion.matches(&input.status).then_some(now);
    let task = Task {
        id: fresh_id(),
        taskid: input.taskid,
        title: input.title,
        date: input.date.unwrap_or(now),
        due_date: input.due_date.unwrap_or(now),
        status: input.status,
        sub_status: input.sub_status.unwrap_or_default(),
        importance: input.importance,
        bid_origin: input.bid_origin,
        desc: input.desc.unwrap_or_default(),
        remarks: input.remarks.unwrap_or_default(),
        completion_date,
    };
    task.validate()?;
    Ok(task)
}

/// Move a task to `new_status`, adjusting the completion date. Nothing else changes.
pub fn apply_status_change(
    task: &Task,
    new_status: &str,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> Task {
    let mut next = task.clone();
    next.completion_date = settle_completion(
        task.completion_date,
        task.is_done(completion),
        completion.matches(new_status),
        now,
    );
    next.status = new_status.to_string();
    next
}

/// Merge `patch` into `task`. The result is validated as a whole; on error the
/// original task is untouched.
pub fn update_task(
    task: &Task,
    patch: TaskPatch,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> BoardResult<Task> {
    let mut next = match patch.status.as_deref() {
        Some(status) if status != task.status => apply_status_change(task, status, completion, now),
        _ => task.clone(),
    };

    if let Some(v) = patch.taskid {
        next.taskid = v;
    }
    if let Some(v) = patch.title {
        next.title = v;
    }
    if let Some(v) = patch.date {
        next.date = v;
    }
    if let Some(v) = patch.due_date {
        next.due_date = v;
    }
    if let Some(v) = patch.sub_status {
        next.sub_status = v;
    }
    if let Some(v) = patch.importance {
        next.importance = v;
    }
    if let Some(v) = patch.bid_origin {
        next.bid_origin = v;
    }
    if let Some(v) = patch.desc {
        next.desc = v;
    }
    if let Some(v) = patch.remarks {
        next.remarks = v;
    }

    next.validate()?;
    Ok(next)
}
