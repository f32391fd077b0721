//! Command implementations for the CLI interface.
//!
//! Each handler loads nothing itself: `main` hands it the board and the resolved
//! completion category. Handlers that change the board compute the new state
//! first and save once at the end.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};
use serde_json::Value;

use crate::config::{CompletionCategory, ViewContext};
use crate::dates::{format_due_relative, parse_instant_input};
use crate::db::{create_backup, truncate, Database};
use crate::error::{BoardError, BoardResult};
use crate::fields::*;
use crate::filters::*;
use crate::import::{accept_candidates, import_document, parse_candidates};
use crate::task::{apply_status_change, create_task, update_task, Task, TaskInput, TaskPatch};
use crate::taxonomy::{
    AppSettings, BidOrigin, ImportanceLevel, SubCategory, TaxonomyEntry, WorkflowCategory,
    DEFAULT_COLOR,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// List tasks with search, filters and sorting.
    List {
        /// Case-insensitive text matched against title and taskid.
        #[arg(long, short)]
        search: Option<String>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Only tasks with this exact status.
        #[arg(long)]
        status: Option<String>,
        /// Due window: today | this-week | overdue.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Title)]
        sort: SortKey,
        /// Sort descending.
        #[arg(long)]
        desc: bool,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by id or taskid.
    View {
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task id or taskid.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Move a task to another workflow category.
    Move {
        /// Task id or taskid.
        id: String,
        /// Target category name.
        status: String,
    },

    /// Delete a task permanently.
    Delete {
        /// Task id or taskid.
        id: String,
    },

    /// Delete every task (the taxonomy is kept).
    Clear {
        /// Skip creating a backup first.
        #[arg(long)]
        no_backup: bool,
    },

    /// Show tasks laid out as board columns.
    Board {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
    },

    /// Dashboard counts and distributions.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Completed tasks per week.
    Trend,

    /// Manage workflow categories, sub-categories, importance levels and origins.
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },

    /// Export the board as JSON.
    Export {
        /// Output file path (stdout when omitted).
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Replace the board with an imported JSON document.
    Import {
        /// Input JSON file path.
        input: String,
        /// Skip creating a backup before import.
        #[arg(long)]
        no_backup: bool,
    },

    /// Accept generated task suggestions from a JSON file ("-" for stdin).
    Accept {
        input: String,
    },

    /// Create a timestamped backup of the board file.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Task fields shared by `add` and `update`.
#[derive(Args, Default)]
pub struct TaskFields {
    /// External reference, e.g. a bid number.
    #[arg(long)]
    pub taskid: Option<String>,
    /// Start date: YYYY-MM-DD, RFC 3339, "today", "in Nd", weekday names.
    #[arg(long)]
    pub date: Option<String>,
    /// Due date, same formats as --date.
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub sub_status: Option<String>,
    #[arg(long)]
    pub importance: Option<String>,
    #[arg(long)]
    pub origin: Option<String>,
    /// Longer description.
    #[arg(long = "description")]
    pub desc: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Subcommand)]
pub enum TaxonomyAction {
    /// List all taxonomy entries.
    List,
    /// Add an entry.
    Add {
        #[arg(value_enum)]
        kind: EntryKind,
        name: String,
        /// Colour for categories and importance levels.
        #[arg(long)]
        color: Option<String>,
        /// Parent category name (sub-categories only).
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename or recolour an entry. Tasks keep their stored names.
    Edit {
        #[arg(value_enum)]
        kind: EntryKind,
        /// Entry id or current name.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Remove an entry. Tasks referring to it are left as they are.
    Remove {
        #[arg(value_enum)]
        kind: EntryKind,
        /// Entry id or name.
        id: String,
    },
}

fn now_local() -> DateTime<Local> {
    Local::now()
}

fn parse_opt_date(
    input: Option<&str>,
    now: &DateTime<Local>,
) -> BoardResult<Option<DateTime<Utc>>> {
    input.map(|s| parse_instant_input(s, now)).transpose()
}

/// Check taxonomy membership of the references a manual write supplies.
fn check_references(settings: &AppSettings, fields: &TaskFields) -> BoardResult<()> {
    let refs = [
        (EntryKind::Category, &fields.status),
        (EntryKind::SubCategory, &fields.sub_status),
        (EntryKind::Importance, &fields.importance),
        (EntryKind::Origin, &fields.origin),
    ];
    for (kind, value) in refs {
        if let Some(name) = value {
            settings.check_reference(kind, name)?;
        }
    }
    Ok(())
}

fn warn_on_foreign_sub_status(task: &Task, settings: &AppSettings) {
    if task.sub_status.is_empty() {
        return;
    }
    if sub_status_options(task, settings).iter().all(|s| s.name != task.sub_status) {
        tracing::warn!(
            sub_status = %task.sub_status,
            status = %task.status,
            "sub-status does not belong to the task's status"
        );
    }
}

/// Add a new task to the board.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    completion: &CompletionCategory,
    title: String,
    fields: TaskFields,
) -> BoardResult<()> {
    check_references(&db.settings, &fields)?;
    let now = now_local();

    let status = match fields.status {
        Some(s) => s,
        None => db.settings.first_category().map(|c| c.name.clone()).unwrap_or_default(),
    };
    let importance = match fields.importance {
        Some(i) => i,
        None => db.settings.default_importance().map(|i| i.name.clone()).unwrap_or_default(),
    };
    let input = TaskInput {
        taskid: fields.taskid.unwrap_or_default(),
        title,
        date: parse_opt_date(fields.date.as_deref(), &now)?,
        due_date: parse_opt_date(fields.due.as_deref(), &now)?,
        status,
        sub_status: fields.sub_status,
        importance,
        bid_origin: fields.origin.unwrap_or_default(),
        desc: fields.desc,
        remarks: fields.remarks,
    };

    let task = create_task(input, completion, now.with_timezone(&Utc))?;
    warn_on_foreign_sub_status(&task, &db.settings);
    let id = task.id.clone();
    db.tasks.push(task);
    db.save(db_path)?;
    println!("Added task {}", id);
    Ok(())
}

/// List tasks with optional filtering, search and sorting.
pub fn cmd_list(
    db: &Database,
    completion: &CompletionCategory,
    search: Option<String>,
    all: bool,
    status: Option<String>,
    due: Option<DueFilter>,
    sort: SortKey,
    desc: bool,
    limit: Option<usize>,
) {
    let ctx = ViewContext::new(&db.settings, completion);
    let now = now_local();

    let mut pool: Vec<Task> = match due {
        Some(window) => filter_due(&db.tasks, &ctx, window, &now).into_iter().cloned().collect(),
        None => db.tasks.clone(),
    };
    pool.retain(|t| {
        if !all && is_done(t, &ctx) {
            return false;
        }
        match &status {
            Some(s) => &t.status == s,
            None => true,
        }
    });

    let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
    let mut rows = search_and_sort(&pool, search.as_deref().unwrap_or(""), sort, direction);
    if let Some(n) = limit {
        rows.truncate(n);
    }
    print_table(&rows, &now);
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], now: &DateTime<Local>) {
    println!(
        "{:<10} {:<14} {:<10} {:<12} {:<17} {}",
        "TaskID", "Status", "Importance", "Due", "Completed", "Title"
    );
    let today = now.date_naive();
    let tz = now.timezone();
    for t in tasks {
        let due = format_due_relative(t.due_date.with_timezone(&tz).date_naive(), today);
        let completed = t
            .completion_date
            .map(|d| d.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<10} {:<14} {:<10} {:<12} {:<17} {}",
            truncate(&t.taskid, 10),
            truncate(&t.status, 14),
            truncate(&t.importance, 10),
            due,
            completed,
            t.title
        );
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, completion: &CompletionCategory, id: String) -> BoardResult<()> {
    let task = db.resolve(&id)?;
    let now = now_local();
    let tz = now.timezone();
    let status_note = if db.settings.find_category(&task.status).is_some() {
        ""
    } else {
        " (uncategorized)"
    };

    println!("ID:           {}", task.id);
    println!("TaskID:       {}", or_dash(&task.taskid));
    println!("Title:        {}", task.title);
    println!("Status:       {}{}", task.status, status_note);
    println!("Sub-status:   {}", or_dash(&task.sub_status));
    println!("Importance:   {}", or_dash(&task.importance));
    println!("Origin:       {}", or_dash(&task.bid_origin));
    println!("Date:         {}", task.date.with_timezone(&tz).format("%Y-%m-%d %H:%M"));
    println!(
        "Due:          {} ({})",
        task.due_date.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
        format_due_relative(task.due_date.with_timezone(&tz).date_naive(), now.date_naive())
    );
    match task.completion_date {
        Some(d) => println!("Completed:    {}", d.with_timezone(&tz).format("%Y-%m-%d %H:%M")),
        None if task.is_done(completion) => println!("Completed:    (no timestamp)"),
        None => println!("Completed:    -"),
    }
    let options: Vec<&str> = sub_status_options(task, &db.settings)
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    if !options.is_empty() {
        println!("Sub-statuses: {}", options.join(", "));
    }
    println!("Description:\n{}\n", or_dash(&task.desc));
    println!("Remarks:\n{}", or_dash(&task.remarks));
    Ok(())
}

/// Update an existing task's fields.
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    completion: &CompletionCategory,
    id: String,
    title: Option<String>,
    fields: TaskFields,
) -> BoardResult<()> {
    check_references(&db.settings, &fields)?;
    let now = now_local();
    let patch = TaskPatch {
        taskid: fields.taskid,
        title,
        date: parse_opt_date(fields.date.as_deref(), &now)?,
        due_date: parse_opt_date(fields.due.as_deref(), &now)?,
        status: fields.status,
        sub_status: fields.sub_status,
        importance: fields.importance,
        bid_origin: fields.origin,
        desc: fields.desc,
        remarks: fields.remarks,
    };
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let current = db.resolve(&id)?;
    let updated = update_task(current, patch, completion, now.with_timezone(&Utc))?;
    warn_on_foreign_sub_status(&updated, &db.settings);
    let task_id = updated.id.clone();
    db.replace(updated)?;
    db.save(db_path)?;
    println!("Updated {}", task_id);
    Ok(())
}

/// Move a task into another column.
pub fn cmd_move(
    db: &mut Database,
    db_path: &Path,
    completion: &CompletionCategory,
    id: String,
    status: String,
) -> BoardResult<()> {
    db.settings.check_reference(EntryKind::Category, &status)?;
    let current = db.resolve(&id)?;
    let moved = apply_status_change(current, &status, completion, Utc::now());
    let message = match moved.completion_date {
        Some(d) if moved.is_done(completion) => {
            format!("Moved {} to {} (completed {})", moved.id, status, d.to_rfc3339())
        }
        _ => format!("Moved {} to {}", moved.id, status),
    };
    db.replace(moved)?;
    db.save(db_path)?;
    println!("{}", message);
    Ok(())
}

/// Delete a task.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String) -> BoardResult<()> {
    let task_id = db.resolve(&id)?.id.clone();
    let removed = db.remove(&task_id)?;
    db.save(db_path)?;
    println!("Deleted {} - {}", removed.id, removed.title);
    Ok(())
}

/// Remove every task, keeping the taxonomy.
pub fn cmd_clear(db: &mut Database, db_path: &Path, no_backup: bool) -> BoardResult<()> {
    if !no_backup && db_path.exists() {
        println!("Created backup: {}", create_backup(db_path)?);
    }
    let count = db.tasks.len();
    db.tasks.clear();
    db.save(db_path)?;
    println!("Deleted {} task(s).", count);
    Ok(())
}

/// Print the board column by column.
pub fn cmd_board(db: &Database, completion: &CompletionCategory, all: bool) {
    let ctx = ViewContext::new(&db.settings, completion);
    let headers = count_by_category(&db.tasks, &db.settings.workflow_categories);
    let board = board_columns(&db.tasks, &ctx, all);

    for (column, header) in board.columns.iter().zip(headers.iter()) {
        println!("== {} ({})", column.category.name, header.count);
        for t in &column.tasks {
            let sub = if t.sub_status.is_empty() {
                String::new()
            } else {
                format!(" [{}]", t.sub_status)
            };
            println!("   {:<10} {}{}", truncate(&t.taskid, 10), t.title, sub);
        }
    }
    if !board.uncategorized.is_empty() {
        println!("== Uncategorized ({})", board.uncategorized.len());
        for t in &board.uncategorized {
            println!("   {:<10} {} <{}>", truncate(&t.taskid, 10), t.title, t.status);
        }
    }
}

fn print_tallies(title: &str, tallies: &[Tally]) {
    println!("{}:", title);
    if tallies.is_empty() {
        println!("  -");
    }
    for t in tallies {
        println!("  {:<20} {}", truncate(&t.name, 20), t.count);
    }
}

/// Dashboard rollup and distribution charts.
pub fn cmd_stats(db: &Database, completion: &CompletionCategory, json: bool) -> BoardResult<()> {
    let ctx = ViewContext::new(&db.settings, completion);
    let now = now_local();
    let summary = summarize(&db.tasks, &ctx, &now);
    let categories = category_distribution(&db.tasks, &ctx);
    let importance = importance_distribution(&db.tasks, &ctx);
    let origins = origin_distribution(&db.tasks, &db.settings.bid_origins);

    if json {
        let doc = serde_json::json!({
            "summary": summary,
            "categories": categories,
            "importance": importance,
            "origins": origins,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Total:               {}", summary.total);
    println!("Active:              {}", summary.active);
    println!("Completed:           {}", summary.completed);
    println!("Overdue:             {}", summary.overdue);
    println!("Due today:           {}", summary.due_today);
    println!("Due this week:       {}", summary.due_this_week);
    println!("Completed this week: {}", summary.completed_this_week);
    print_tallies("Active by category", &categories);
    print_tallies("Active by importance", &importance);
    print_tallies("By origin", &origins);
    Ok(())
}

/// Weekly completion counts, oldest first.
pub fn cmd_trend(db: &Database) {
    let mut any = false;
    for week in weekly_completion_trend(&db.tasks, &Local) {
        any = true;
        println!("{}  {:>4}  {}", week.week_start, week.count, "#".repeat(week.count.min(60)));
    }
    if !any {
        println!("No completed tasks yet.");
    }
}

fn entry_line<T: TaxonomyEntry>(entry: &T, extra: &str) -> String {
    format!("  {:<38} {}{}", entry.id(), entry.name(), extra)
}

/// Manage taxonomy entries.
pub fn cmd_taxonomy(db: &mut Database, db_path: &Path, action: TaxonomyAction) -> BoardResult<()> {
    let settings = &mut db.settings;
    match action {
        TaxonomyAction::List => {
            println!("Workflow categories:");
            for c in &settings.workflow_categories {
                println!("{}", entry_line(c, &format!(" {}", c.color)));
            }
            println!("Sub-categories:");
            for s in &settings.sub_categories {
                println!("{}", entry_line(s, &format!(" <- {}", s.parent_category)));
            }
            println!("Importance levels:");
            for i in &settings.importance_levels {
                println!("{}", entry_line(i, &format!(" {}", i.color)));
            }
            println!("Bid origins:");
            for o in &settings.bid_origins {
                println!("{}", entry_line(o, ""));
            }
            return Ok(());
        }
        TaxonomyAction::Add { kind, name, color, parent } => {
            if name.trim().is_empty() {
                return Err(BoardError::MissingField { field: "name" });
            }
            let color = color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
            match kind {
                EntryKind::Category => settings.add(WorkflowCategory::new(name.clone(), color))?,
                EntryKind::SubCategory => {
                    let parent =
                        parent.ok_or(BoardError::MissingField { field: "parentCategory" })?;
                    settings.check_reference(EntryKind::Category, &parent)?;
                    settings.add(SubCategory::new(name.clone(), parent))?
                }
                EntryKind::Importance => settings.add(ImportanceLevel::new(name.clone(), color))?,
                EntryKind::Origin => settings.add(BidOrigin::new(name.clone()))?,
            }
            println!("Added {} {}", kind.label(), name);
        }
        TaxonomyAction::Edit { kind, id, name, color, parent } => {
            match kind {
                EntryKind::Category => edit_entry::<WorkflowCategory>(settings, &id, |e| {
                    if let Some(n) = name {
                        e.name = n;
                    }
                    if let Some(c) = color {
                        e.color = c;
                    }
                })?,
                EntryKind::SubCategory => {
                    if let Some(p) = &parent {
                        settings.check_reference(EntryKind::Category, p)?;
                    }
                    edit_entry::<SubCategory>(settings, &id, |e| {
                        if let Some(n) = name {
                            e.name = n;
                        }
                        if let Some(p) = parent {
                            e.parent_category = p;
                        }
                    })?
                }
                EntryKind::Importance => edit_entry::<ImportanceLevel>(settings, &id, |e| {
                    if let Some(n) = name {
                        e.name = n;
                    }
                    if let Some(c) = color {
                        e.color = c;
                    }
                })?,
                EntryKind::Origin => edit_entry::<BidOrigin>(settings, &id, |e| {
                    if let Some(n) = name {
                        e.name = n;
                    }
                })?,
            }
            println!("Updated {} {}", kind.label(), id);
        }
        TaxonomyAction::Remove { kind, id } => {
            let name = match kind {
                EntryKind::Category => remove_entry::<WorkflowCategory>(settings, &id)?,
                EntryKind::SubCategory => remove_entry::<SubCategory>(settings, &id)?,
                EntryKind::Importance => remove_entry::<ImportanceLevel>(settings, &id)?,
                EntryKind::Origin => remove_entry::<BidOrigin>(settings, &id)?,
            };
            println!("Removed {} {}", kind.label(), name);
        }
    }
    db.save(db_path)
}

fn edit_entry<T: TaxonomyEntry>(
    settings: &mut AppSettings,
    ident: &str,
    edit: impl FnOnce(&mut T),
) -> BoardResult<()> {
    let id = settings.resolve_id::<T>(ident)?;
    let mut entry = settings
        .get::<T>(&id)
        .cloned()
        .ok_or_else(|| BoardError::NotFound { kind: T::KIND.label(), id: id.clone() })?;
    edit(&mut entry);
    if entry.name().trim().is_empty() {
        return Err(BoardError::MissingField { field: "name" });
    }
    settings.update(entry)
}

fn remove_entry<T: TaxonomyEntry>(settings: &mut AppSettings, ident: &str) -> BoardResult<String> {
    let id = settings.resolve_id::<T>(ident)?;
    let removed: T = settings.remove(&id)?;
    Ok(removed.name().to_string())
}

/// Write the board as a `{settings, tasks}` JSON document.
pub fn cmd_export(db: &Database, output: Option<String>) -> BoardResult<()> {
    let data = serde_json::to_string_pretty(db)?;
    match output {
        Some(path) => {
            fs::write(&path, data)?;
            println!("Exported {} task(s) to {}", db.tasks.len(), path);
        }
        None => println!("{}", data),
    }
    Ok(())
}

/// Replace the board with the contents of an import file.
pub fn cmd_import(
    db: &mut Database,
    db_path: &Path,
    completion: &CompletionCategory,
    input: String,
    no_backup: bool,
) -> BoardResult<()> {
    let raw = fs::read_to_string(&input)?;
    let value: Value = serde_json::from_str(&raw)?;
    let outcome = import_document(&value, completion, Utc::now());

    if !no_backup && db_path.exists() {
        println!("Created backup: {}", create_backup(db_path)?);
    }
    let count = outcome.tasks.len();
    db.settings = outcome.settings;
    db.tasks = outcome.tasks;
    db.save(db_path)?;
    let how = if outcome.normalized { "normalized" } else { "canonical" };
    println!("Imported {} task(s) ({} input).", count, how);
    Ok(())
}

/// Validate generated task suggestions and add them to the board.
pub fn cmd_accept(
    db: &mut Database,
    db_path: &Path,
    completion: &CompletionCategory,
    input: String,
) -> BoardResult<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&input)?
    };
    let candidates = parse_candidates(&raw)?;
    let tasks = accept_candidates(candidates, &db.settings, completion, Utc::now())?;
    let count = tasks.len();
    db.tasks.extend(tasks);
    db.save(db_path)?;
    println!("Accepted {} suggested task(s).", count);
    Ok(())
}

/// Create a backup of the board file.
pub fn cmd_backup(db_path: &Path) -> BoardResult<()> {
    println!("Backup created: {}", create_backup(db_path)?);
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
