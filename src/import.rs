//! Import and normalization of loosely structured board data.
//!
//! External exports disagree on field names and routinely omit fields. `normalize`
//! maps whatever it is given onto the canonical `{settings, tasks}` shape, task by
//! task, without ever dropping or merging records. Running it on its own exported
//! output yields the same field values again (ids aside).
//!
//! The same module validates candidate tasks proposed by a text generator before
//! they are allowed onto the board.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::CompletionCategory;
use crate::dates::parse_loose_instant;
use crate::db::Database;
use crate::error::{BoardError, BoardResult};
use crate::task::{create_task, Task, TaskInput};
use crate::taxonomy::{
    fresh_id, AppSettings, BidOrigin, ImportanceLevel, SubCategory, WorkflowCategory, DEFAULT_COLOR,
};

/// Title given to records with neither a title, a description nor a taskid.
pub const UNTITLED: &str = "Untitled task";

const COMPLETION_COLOR: &str = "#22c55e";

/// Canonical data produced from an import.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub settings: AppSettings,
    pub tasks: Vec<Task>,
}

/// Result of `import_document`.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub settings: AppSettings,
    pub tasks: Vec<Task>,
    /// False when the input was already canonical and was taken verbatim.
    pub normalized: bool,
}

/// First present, non-null value among `keys`.
fn field<'v>(obj: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

/// First non-blank text value among `keys`; numbers are accepted and stringified.
fn text(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn entries<'v>(settings: &'v Value, keys: &[&str]) -> &'v [Value] {
    field(settings, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Entry name: the item itself when it is a bare string, else its name field.
fn entry_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => text(item, &["name", "label", "title", "value"]),
    }
}

fn entry_color(item: &Value) -> String {
    text(item, &["color", "colour"]).unwrap_or_else(|| DEFAULT_COLOR.to_string())
}

fn named<T>(items: &[Value], kind: &str, build: impl Fn(String, &Value) -> T) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match entry_name(item) {
            Some(name) => Some(build(name, item)),
            None => {
                tracing::warn!(kind, "skipping taxonomy entry without a name");
                None
            }
        })
        .collect()
}

fn normalize_settings(raw: &Value, completion: &CompletionCategory) -> AppSettings {
    let workflow_categories = named(
        entries(raw, &["workflowCategories", "statuses", "categories"]),
        "workflow category",
        |name, item| WorkflowCategory { id: fresh_id(), name, color: entry_color(item) },
    );
    let sub_categories = named(
        entries(raw, &["subCategories", "subStatuses"]),
        "sub-category",
        |name, item| SubCategory {
            id: fresh_id(),
            name,
            parent_category: text(item, &["parentCategory", "parentStatus", "parent", "status"])
                .unwrap_or_default(),
        },
    );
    let importance_levels = named(
        entries(raw, &["importanceLevels", "importance", "priorities"]),
        "importance level",
        |name, item| ImportanceLevel { id: fresh_id(), name, color: entry_color(item) },
    );
    let bid_origins = named(
        entries(raw, &["bidOrigins", "origins"]),
        "bid origin",
        |name, _| BidOrigin { id: fresh_id(), name },
    );

    let mut settings = AppSettings {
        workflow_categories,
        sub_categories,
        importance_levels,
        bid_origins,
    };
    if !settings.workflow_categories.iter().any(|c| completion.matches(&c.name)) {
        tracing::info!(name = completion.name(), "adding missing completion category");
        settings
            .workflow_categories
            .push(WorkflowCategory::new(completion.name(), COMPLETION_COLOR));
    }
    settings
}

fn normalize_task(raw: &Value, settings: &AppSettings, now: DateTime<Utc>) -> Task {
    let taskid = text(raw, &["taskid", "taskId", "task_id", "bidId", "ref"]).unwrap_or_default();
    let desc = text(raw, &["desc", "description", "details"]);
    let title = text(raw, &["title", "name"])
        .or_else(|| desc.clone())
        .or_else(|| (!taskid.is_empty()).then(|| taskid.clone()))
        .unwrap_or_else(|| UNTITLED.to_string());

    let instant = |keys: &[&str]| field(raw, keys).and_then(parse_loose_instant);

    let status = {
        let given = text(raw, &["status", "category", "column"]).unwrap_or_default();
        let folded = given.to_lowercase();
        settings
            .workflow_categories
            .iter()
            .find(|c| c.name == given)
            .or_else(|| {
                settings
                    .workflow_categories
                    .iter()
                    .find(|c| c.name.to_lowercase() == folded)
            })
            .or_else(|| settings.first_category())
            .map(|c| c.name.clone())
            .unwrap_or(given)
    };

    let importance = text(raw, &["importance", "priority"])
        .or_else(|| settings.default_importance().map(|i| i.name.clone()))
        .unwrap_or_default();

    Task {
        id: fresh_id(),
        taskid,
        title,
        date: instant(&["date", "createdAt", "created", "startDate"]).unwrap_or(now),
        due_date: instant(&["dueDate", "due_date", "due", "deadline"]).unwrap_or(now),
        status,
        sub_status: text(raw, &["subStatus", "sub_status", "subCategory"]).unwrap_or_default(),
        importance,
        bid_origin: text(raw, &["bidOrigin", "origin", "source"]).unwrap_or_default(),
        desc: desc.unwrap_or_default(),
        remarks: text(raw, &["remarks", "notes", "comment"]).unwrap_or_default(),
        completion_date: instant(&["completionDate", "completedAt", "completed_at"]),
    }
}

/// Convert arbitrary external data into canonical settings and tasks.
///
/// `now` stands in for every missing or unparseable date.
pub fn normalize(
    external: &Value,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> Normalized {
    let raw_settings = external.get("settings").unwrap_or(&Value::Null);
    let settings = normalize_settings(raw_settings, completion);

    let raw_tasks: &[Value] = match external {
        Value::Array(items) => items,
        _ => entries(external, &["tasks"]),
    };
    let tasks: Vec<Task> = raw_tasks
        .iter()
        .map(|raw| normalize_task(raw, &settings, now))
        .collect();

    warn_on_duplicate_taskids(&tasks);
    Normalized { settings, tasks }
}

fn warn_on_duplicate_taskids(tasks: &[Task]) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for t in tasks.iter().filter(|t| !t.taskid.is_empty()) {
        *seen.entry(t.taskid.as_str()).or_default() += 1;
    }
    let dupes: Vec<&str> = seen.into_iter().filter(|(_, n)| *n > 1).map(|(id, _)| id).collect();
    if !dupes.is_empty() {
        tracing::warn!(taskids = ?dupes, "duplicate taskids kept as separate tasks");
    }
}

/// Whether `value` is an already-canonical export that can be taken verbatim.
fn as_canonical(value: &Value, completion: &CompletionCategory) -> Option<Database> {
    let doc: Database = serde_json::from_value(value.clone()).ok()?;
    doc.settings.validate().ok()?;
    doc.settings
        .workflow_categories
        .iter()
        .any(|c| completion.matches(&c.name))
        .then_some(doc)
}

/// Import a document: canonical exports pass through untouched, anything else is normalized.
pub fn import_document(
    value: &Value,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> ImportOutcome {
    if let Some(doc) = as_canonical(value, completion) {
        tracing::debug!(tasks = doc.tasks.len(), "importing canonical document");
        return ImportOutcome { settings: doc.settings, tasks: doc.tasks, normalized: false };
    }
    let Normalized { settings, tasks } = normalize(value, completion, now);
    tracing::debug!(tasks = tasks.len(), "normalized external document");
    ImportOutcome { settings, tasks, normalized: true }
}

/// A task proposed by the text-generation collaborator. Untrusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCandidate {
    #[serde(default)]
    pub taskid: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub days_from_now: i64,
}

/// Parse the collaborator's raw response: a list of candidates, or `{"tasks": [...]}`.
pub fn parse_candidates(raw: &str) -> BoardResult<Vec<TaskCandidate>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Response {
        List(Vec<TaskCandidate>),
        Wrapped { tasks: Vec<TaskCandidate> },
    }

    match serde_json::from_str::<Response>(raw) {
        Ok(Response::List(list)) | Ok(Response::Wrapped { tasks: list }) => Ok(list),
        Err(e) => Err(BoardError::Collaborator(format!("unreadable task suggestions: {e}"))),
    }
}

/// Turn candidates into real tasks through the same validation as manual entry.
///
/// Unknown statuses fall back to the first category and unknown importance to
/// the default level. One invalid candidate rejects the whole batch.
pub fn accept_candidates(
    candidates: Vec<TaskCandidate>,
    settings: &AppSettings,
    completion: &CompletionCategory,
    now: DateTime<Utc>,
) -> BoardResult<Vec<Task>> {
    let fallback_status = settings
        .first_category()
        .map(|c| c.name.clone())
        .ok_or_else(|| BoardError::InvalidField {
            field: "workflowCategories",
            reason: "at least one workflow category is required".into(),
        })?;
    let fallback_importance = settings
        .default_importance()
        .map(|i| i.name.clone())
        .unwrap_or_default();

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let status = if settings.find_category(&c.status).is_some() {
                c.status
            } else {
                tracing::warn!(
                    candidate = i,
                    status = %c.status,
                    "unknown status, using first category"
                );
                fallback_status.clone()
            };
            let importance = if settings.find_importance(&c.importance).is_some() {
                c.importance
            } else {
                tracing::warn!(
                    candidate = i,
                    importance = %c.importance,
                    "unknown importance, using default"
                );
                fallback_importance.clone()
            };
            let due_date = Duration::try_days(c.days_from_now)
                .and_then(|d| now.checked_add_signed(d))
                .ok_or_else(|| BoardError::InvalidField {
                    field: "daysFromNow",
                    reason: format!("candidate {i}: {} days is out of range", c.days_from_now),
                })?;
            let input = TaskInput {
                taskid: c.taskid,
                title: c.desc.clone(),
                date: Some(now),
                due_date: Some(due_date),
                status,
                importance,
                desc: Some(c.desc),
                ..Default::default()
            };
            create_task(input, completion, now).map_err(|e| BoardError::InvalidField {
                field: "candidates",
                reason: format!("candidate {i}: {e}"),
            })
        })
        .collect()
}
