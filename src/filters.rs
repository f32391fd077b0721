//! Filter and aggregation engine behind the board, dashboard and report views.
//!
//! Everything here is a pure function of its arguments. Date windows are computed
//! from the caller-supplied `now` and in `now`'s time zone; nothing reads the clock.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::config::ViewContext;
use crate::dates::{local_day, start_end_of_week};
use crate::fields::{DueFilter, SortDirection, SortKey};
use crate::task::Task;
use crate::taxonomy::{AppSettings, BidOrigin, SubCategory, WorkflowCategory};

/// A named count, as shown in column headers and distribution charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub name: String,
    pub count: usize,
}

/// Completions in one week, keyed by the week's Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCompletion {
    pub week_start: NaiveDate,
    pub count: usize,
}

pub fn is_done(task: &Task, ctx: &ViewContext) -> bool {
    ctx.completion.matches(&task.status)
}

pub fn filter_active<'t>(tasks: &'t [Task], ctx: &ViewContext) -> Vec<&'t Task> {
    tasks.iter().filter(|t| !is_done(t, ctx)).collect()
}

pub fn filter_completed<'t>(tasks: &'t [Task], ctx: &ViewContext) -> Vec<&'t Task> {
    tasks.iter().filter(|t| is_done(t, ctx)).collect()
}

/// Active tasks due before the start of today.
pub fn filter_overdue<'t, Tz: TimeZone>(
    tasks: &'t [Task],
    ctx: &ViewContext,
    now: &DateTime<Tz>,
) -> Vec<&'t Task> {
    let today = now.date_naive();
    let tz = now.timezone();
    tasks
        .iter()
        .filter(|t| !is_done(t, ctx) && local_day(&t.due_date, &tz) < today)
        .collect()
}

/// Tasks due on the same calendar day as `now`.
pub fn filter_due_today<'t, Tz: TimeZone>(tasks: &'t [Task], now: &DateTime<Tz>) -> Vec<&'t Task> {
    let today = now.date_naive();
    let tz = now.timezone();
    tasks.iter().filter(|t| local_day(&t.due_date, &tz) == today).collect()
}

/// Tasks due between Monday and Sunday of `now`'s week, inclusive.
pub fn filter_due_this_week<'t, Tz: TimeZone>(
    tasks: &'t [Task],
    now: &DateTime<Tz>,
) -> Vec<&'t Task> {
    let (start, end) = start_end_of_week(now.date_naive());
    let tz = now.timezone();
    tasks
        .iter()
        .filter(|t| {
            let day = local_day(&t.due_date, &tz);
            day >= start && day <= end
        })
        .collect()
}

pub fn filter_due<'t, Tz: TimeZone>(
    tasks: &'t [Task],
    ctx: &ViewContext,
    window: DueFilter,
    now: &DateTime<Tz>,
) -> Vec<&'t Task> {
    match window {
        DueFilter::Today => filter_due_today(tasks, now),
        DueFilter::ThisWeek => filter_due_this_week(tasks, now),
        DueFilter::Overdue => filter_overdue(tasks, ctx, now),
    }
}

/// Raw per-category counts in taxonomy order, zeros included (column headers).
pub fn count_by_category(tasks: &[Task], categories: &[WorkflowCategory]) -> Vec<Tally> {
    categories
        .iter()
        .map(|c| Tally {
            name: c.name.clone(),
            count: tasks.iter().filter(|t| t.status == c.name).count(),
        })
        .collect()
}

/// Active tasks per category, categories without active tasks dropped.
pub fn category_distribution(tasks: &[Task], ctx: &ViewContext) -> Vec<Tally> {
    let active: Vec<Task> = filter_active(tasks, ctx).into_iter().cloned().collect();
    count_by_category(&active, &ctx.settings.workflow_categories)
        .into_iter()
        .filter(|t| t.count > 0)
        .collect()
}

/// Active tasks per importance level, zero counts dropped.
pub fn importance_distribution(tasks: &[Task], ctx: &ViewContext) -> Vec<Tally> {
    let active = filter_active(tasks, ctx);
    ctx.settings
        .importance_levels
        .iter()
        .map(|level| Tally {
            name: level.name.clone(),
            count: active.iter().filter(|t| t.importance == level.name).count(),
        })
        .filter(|t| t.count > 0)
        .collect()
}

/// Tasks per origin name, zero counts dropped.
pub fn origin_distribution(tasks: &[Task], origins: &[BidOrigin]) -> Vec<Tally> {
    origins
        .iter()
        .map(|o| Tally {
            name: o.name.clone(),
            count: tasks.iter().filter(|t| t.bid_origin == o.name).count(),
        })
        .filter(|t| t.count > 0)
        .collect()
}

/// Completed tasks grouped by the ISO week (in `tz`) of their completion date,
/// ascending by week. Tasks without a completion date are skipped.
///
/// Each call recomputes from `tasks`; iterate again by calling again.
pub fn weekly_completion_trend<Tz: TimeZone>(
    tasks: &[Task],
    tz: &Tz,
) -> impl Iterator<Item = WeeklyCompletion> {
    let mut weeks: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for completed in tasks.iter().filter_map(|t| t.completion_date) {
        let (week_start, _) = start_end_of_week(local_day(&completed, tz));
        *weeks.entry(week_start).or_default() += 1;
    }
    weeks
        .into_iter()
        .map(|(week_start, count)| WeeklyCompletion { week_start, count })
}

/// Case-insensitive search over `title` and `taskid`, then a stable sort.
///
/// A missing completion date sorts as the Unix epoch, i.e. before any set date.
pub fn search_and_sort<'t>(
    tasks: &'t [Task],
    search: &str,
    key: SortKey,
    direction: SortDirection,
) -> Vec<&'t Task> {
    let needle = search.trim().to_lowercase();
    let mut found: Vec<&Task> = tasks
        .iter()
        .filter(|t| {
            needle.is_empty()
                || t.title.to_lowercase().contains(&needle)
                || t.taskid.to_lowercase().contains(&needle)
        })
        .collect();

    found.sort_by(|a, b| {
        let ord = compare_by(a, b, key);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    found
}

fn compare_by(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => compare_text(&a.title, &b.title),
        SortKey::Taskid => compare_text(&a.taskid, &b.taskid),
        SortKey::Remarks => compare_text(&a.remarks, &b.remarks),
        SortKey::CompletionDate => {
            epoch_millis(a.completion_date).cmp(&epoch_millis(b.completion_date))
        }
        SortKey::DueDate => a.due_date.cmp(&b.due_date),
        SortKey::Date => a.date.cmp(&b.date),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn epoch_millis(instant: Option<DateTime<Utc>>) -> i64 {
    instant.map_or(0, |d| d.timestamp_millis())
}

/// Sub-categories selectable for a task: those whose parent is its current status.
pub fn sub_status_options<'a>(task: &Task, settings: &'a AppSettings) -> Vec<&'a SubCategory> {
    settings.sub_categories_of(&task.status).collect()
}

/// One Kanban column.
#[derive(Debug)]
pub struct BoardColumn<'a, 't> {
    pub category: &'a WorkflowCategory,
    pub tasks: Vec<&'t Task>,
}

/// Tasks laid out per workflow category, plus the ones whose status names no
/// existing category.
#[derive(Debug)]
pub struct BoardView<'a, 't> {
    pub columns: Vec<BoardColumn<'a, 't>>,
    pub uncategorized: Vec<&'t Task>,
}

pub fn board_columns<'a, 't>(
    tasks: &'t [Task],
    ctx: &ViewContext<'a>,
    include_done: bool,
) -> BoardView<'a, 't> {
    let settings: &'a AppSettings = ctx.settings;
    let mut columns: Vec<BoardColumn<'a, 't>> = settings
        .workflow_categories
        .iter()
        .map(|category| BoardColumn { category, tasks: Vec::new() })
        .collect();
    let mut uncategorized = Vec::new();

    for task in tasks {
        if !include_done && is_done(task, ctx) {
            continue;
        }
        match columns.iter_mut().find(|c| c.category.name == task.status) {
            Some(column) => column.tasks.push(task),
            None => {
                tracing::debug!(
                    task = %task.id,
                    status = %task.status,
                    "task status matches no category"
                );
                uncategorized.push(task);
            }
        }
    }

    BoardView { columns, uncategorized }
}

/// Dashboard rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
    /// Active tasks due today.
    pub due_today: usize,
    /// Active tasks due this week.
    pub due_this_week: usize,
    pub completed_this_week: usize,
}

pub fn summarize<Tz: TimeZone>(
    tasks: &[Task],
    ctx: &ViewContext,
    now: &DateTime<Tz>,
) -> BoardSummary {
    let active: Vec<Task> = filter_active(tasks, ctx).into_iter().cloned().collect();
    let tz = now.timezone();
    let (week_start, week_end) = start_end_of_week(now.date_naive());
    let completed_this_week = tasks
        .iter()
        .filter(|t| is_done(t, ctx))
        .filter_map(|t| t.completion_date)
        .map(|d| local_day(&d, &tz))
        .filter(|d| *d >= week_start && *d <= week_end)
        .count();

    BoardSummary {
        total: tasks.len(),
        active: active.len(),
        completed: filter_completed(tasks, ctx).len(),
        overdue: filter_overdue(tasks, ctx, now).len(),
        due_today: filter_due_today(&active, now).len(),
        due_this_week: filter_due_this_week(&active, now).len(),
        completed_this_week,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionCategory;
    use crate::task::{apply_status_change, create_task, TaskInput};
    use crate::taxonomy::{ImportanceLevel, DEFAULT_COLOR};
    use chrono::{Duration, FixedOffset};

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 3, 13, 15, 0, 0).unwrap()
    }

    fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
    }

    fn settings() -> AppSettings {
        AppSettings {
            workflow_categories: vec![
                WorkflowCategory::new("Not Started", DEFAULT_COLOR),
                WorkflowCategory::new("In Progress", DEFAULT_COLOR),
                WorkflowCategory::new("Done", DEFAULT_COLOR),
            ],
            sub_categories: vec![SubCategory::new("Awaiting docs", "In Progress")],
            importance_levels: vec![
                ImportanceLevel::new("High", DEFAULT_COLOR),
                ImportanceLevel::new("Low", DEFAULT_COLOR),
            ],
            bid_origins: vec![BidOrigin::new("Email"), BidOrigin::new("Portal")],
        }
    }

    fn task(taskid: &str, title: &str, status: &str, due: DateTime<Utc>) -> Task {
        let input = TaskInput {
            taskid: taskid.into(),
            title: title.into(),
            due_date: Some(due),
            status: status.into(),
            importance: "High".into(),
            bid_origin: "Email".into(),
            ..Default::default()
        };
        create_task(input, &CompletionCategory::default(), now()).unwrap()
    }

    fn sample() -> Vec<Task> {
        vec![
            task("A-1", "Roof survey", "Not Started", now() - Duration::days(1)),
            task("A-2", "Fence quote", "In Progress", now()),
            task("A-3", "Gate repair", "Done", now() - Duration::days(3)),
            task("A-4", "Paint shed", "Archived", now() + Duration::days(2)),
            task("A-5", "Drainage", "In Progress", now() + Duration::days(10)),
        ]
    }

    #[test]
    fn test_active_and_done_partition_tasks() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        let active = filter_active(&tasks, &ctx);
        let done = filter_completed(&tasks, &ctx);
        assert_eq!(active.len() + done.len(), tasks.len());
        assert!(active.iter().all(|a| !done.iter().any(|d| d.id == a.id)));
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn test_overdue_excludes_done_and_today() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        let overdue: Vec<&str> = filter_overdue(&tasks, &ctx, &now())
            .iter()
            .map(|t| t.taskid.as_str())
            .collect();
        assert_eq!(overdue, vec!["A-1"]);
    }

    #[test]
    fn test_overdue_task_leaves_view_when_done() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let late = task("X-1", "Late", "Not Started", now() - Duration::days(1));
        assert_eq!(filter_overdue(std::slice::from_ref(&late), &ctx, &now()).len(), 1);
        let finished = apply_status_change(&late, "Done", &c, now());
        assert!(filter_overdue(&[finished], &ctx, &now()).is_empty());
    }

    #[test]
    fn test_due_today_is_calendar_day_equality() {
        let tasks = vec![
            task("T-1", "Morning", "Not Started", at(2024, 3, 13, 0, 5)),
            task("T-2", "Night", "Done", at(2024, 3, 13, 23, 59)),
            task("T-3", "Tomorrow", "Not Started", at(2024, 3, 14, 0, 0)),
        ];
        let ids: Vec<&str> = filter_due_today(&tasks, &now())
            .iter()
            .map(|t| t.taskid.as_str())
            .collect();
        assert_eq!(ids, vec!["T-1", "T-2"]);
    }

    #[test]
    fn test_due_today_follows_caller_time_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local_now = now().with_timezone(&tokyo); // 2024-03-14 00:00 in Tokyo
        let tasks = vec![task("Z-1", "Early UTC", "Not Started", at(2024, 3, 14, 1, 0))];
        assert_eq!(filter_due_today(&tasks, &local_now).len(), 1);
        assert!(filter_due_today(&tasks, &now()).is_empty());
    }

    #[test]
    fn test_due_this_week_inclusive_bounds() {
        let monday = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        let sunday_late = Utc.with_ymd_and_hms(2024, 3, 17, 23, 59, 59).unwrap();
        let tasks = vec![
            task("W-1", "Monday", "Not Started", monday),
            task("W-2", "Sunday", "Not Started", sunday_late),
            task("W-3", "Prev Sunday", "Not Started", monday - Duration::seconds(1)),
            task("W-4", "Next Monday", "Not Started", sunday_late + Duration::seconds(1)),
        ];
        let ids: Vec<&str> = filter_due_this_week(&tasks, &now())
            .iter()
            .map(|t| t.taskid.as_str())
            .collect();
        assert_eq!(ids, vec!["W-1", "W-2"]);
    }

    #[test]
    fn test_count_by_category_keeps_zeros_distribution_drops_them() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        let raw = count_by_category(&tasks, &s.workflow_categories);
        assert_eq!(
            raw,
            vec![
                Tally { name: "Not Started".into(), count: 1 },
                Tally { name: "In Progress".into(), count: 2 },
                Tally { name: "Done".into(), count: 1 },
            ]
        );
        let dist = category_distribution(&tasks, &ctx);
        assert_eq!(dist.len(), 2);
        assert!(dist.iter().all(|t| t.name != "Done"));
    }

    #[test]
    fn test_origin_and_importance_distributions_drop_zero() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        assert_eq!(
            origin_distribution(&tasks, &s.bid_origins),
            vec![Tally { name: "Email".into(), count: 5 }]
        );
        assert_eq!(
            importance_distribution(&tasks, &ctx),
            vec![Tally { name: "High".into(), count: 4 }]
        );
        assert!(origin_distribution(&tasks, &[]).is_empty());
    }

    #[test]
    fn test_weekly_trend_sorted_and_sums_to_completed() {
        let c = CompletionCategory::default();
        let mut tasks = Vec::new();
        for (i, day) in [20, 4, 5, 21, 13].iter().enumerate() {
            let t = task(&format!("C-{i}"), "Done thing", "Not Started", now());
            let at = Utc.with_ymd_and_hms(2024, 3, *day, 10, 0, 0).unwrap();
            tasks.push(apply_status_change(&t, "Done", &c, at));
        }
        tasks.push(task("C-open", "Open thing", "Not Started", now()));

        let trend: Vec<WeeklyCompletion> = weekly_completion_trend(&tasks, &Utc).collect();
        let weeks: Vec<NaiveDate> = trend.iter().map(|w| w.week_start).collect();
        assert!(weeks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(weeks[0], NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(trend.iter().map(|w| w.count).collect::<Vec<_>>(), vec![2, 1, 2]);
        let total: usize = trend.iter().map(|w| w.count).sum();
        assert_eq!(total, tasks.iter().filter(|t| t.completion_date.is_some()).count());

        let again: Vec<WeeklyCompletion> = weekly_completion_trend(&tasks, &Utc).collect();
        assert_eq!(again, trend);
    }

    #[test]
    fn test_search_matches_title_and_taskid_case_insensitively() {
        let tasks = sample();
        let hits = search_and_sort(&tasks, "ROOF", SortKey::Title, SortDirection::Asc);
        assert_eq!(hits.len(), 1);
        let hits = search_and_sort(&tasks, "a-", SortKey::Taskid, SortDirection::Desc);
        let ids: Vec<&str> = hits.iter().map(|t| t.taskid.as_str()).collect();
        assert_eq!(ids, vec!["A-5", "A-4", "A-3", "A-2", "A-1"]);
    }

    #[test]
    fn test_missing_completion_dates_sort_first() {
        let c = CompletionCategory::default();
        let open = task("S-1", "Finished", "Not Started", now());
        let finished = apply_status_change(&open, "Done", &c, now());
        let tasks = vec![
            finished,
            task("S-2", "Open one", "Not Started", now()),
            task("S-3", "Open two", "Not Started", now()),
        ];
        let asc: Vec<&str> =
            search_and_sort(&tasks, "", SortKey::CompletionDate, SortDirection::Asc)
                .iter()
                .map(|t| t.taskid.as_str())
                .collect();
        assert_eq!(asc, vec!["S-2", "S-3", "S-1"]);

        let desc: Vec<&str> =
            search_and_sort(&tasks, "", SortKey::CompletionDate, SortDirection::Desc)
                .iter()
                .map(|t| t.taskid.as_str())
                .collect();
        assert_eq!(desc[0], "S-1");
    }

    #[test]
    fn test_board_columns_and_uncategorized() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        let board = board_columns(&tasks, &ctx, false);
        assert_eq!(board.columns.len(), 3);
        assert_eq!(board.columns[1].tasks.len(), 2);
        assert!(board.columns[2].tasks.is_empty());
        assert_eq!(board.uncategorized.len(), 1);
        assert_eq!(board.uncategorized[0].status, "Archived");

        let with_done = board_columns(&tasks, &ctx, true);
        assert_eq!(with_done.columns[2].tasks.len(), 1);
    }

    #[test]
    fn test_sub_status_options_follow_status() {
        let s = settings();
        let tasks = sample();
        assert_eq!(sub_status_options(&tasks[1], &s).len(), 1);
        assert!(sub_status_options(&tasks[0], &s).is_empty());
    }

    #[test]
    fn test_engine_tolerates_empty_taxonomy() {
        let s = AppSettings::default();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        assert!(category_distribution(&tasks, &ctx).is_empty());
        assert!(importance_distribution(&tasks, &ctx).is_empty());
        let board = board_columns(&tasks, &ctx, true);
        assert_eq!(board.uncategorized.len(), tasks.len());
    }

    #[test]
    fn test_summary_counts() {
        let s = settings();
        let c = CompletionCategory::default();
        let ctx = ViewContext::new(&s, &c);
        let tasks = sample();
        let summary = summarize(&tasks, &ctx, &now());
        assert_eq!(
            summary,
            BoardSummary {
                total: 5,
                active: 4,
                completed: 1,
                overdue: 1,
                due_today: 1,
                due_this_week: 3,
                completed_this_week: 1,
            }
        );
    }
}
