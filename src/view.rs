//! Derived views over a task list.
//!
//! Everything here is a pure function of the tasks plus the current
//! filter, search query and sort settings. Nothing is cached; callers
//! recompute on every read.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::{Error, Result};
use crate::task::{Task, TaskStatus};

/// Status tab selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Finished,
    Ongoing,
    Missed,
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Finished => task.status == TaskStatus::Finished,
            Filter::Ongoing => task.status == TaskStatus::Ongoing,
            Filter::Missed => task.status == TaskStatus::Missed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Finished => "finished",
            Filter::Ongoing => "ongoing",
            Filter::Missed => "missed",
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "finished" => Ok(Filter::Finished),
            "ongoing" => Ok(Filter::Ongoing),
            "missed" => Ok(Filter::Missed),
            _ => Err(Error::InvalidArgument(format!(
                "invalid filter '{s}': must be all, finished, ongoing, or missed"
            ))),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Deadline,
    Created,
    Alpha,
    Priority,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Deadline => "deadline",
            SortBy::Created => "created",
            SortBy::Alpha => "alpha",
            SortBy::Priority => "priority",
        }
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deadline" => Ok(SortBy::Deadline),
            "created" => Ok(SortBy::Created),
            "alpha" | "title" => Ok(SortBy::Alpha),
            "priority" => Ok(SortBy::Priority),
            _ => Err(Error::InvalidArgument(format!(
                "invalid sort key '{s}': must be deadline, created, alpha, or priority"
            ))),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::InvalidArgument(format!(
                "invalid sort order '{s}': must be asc or desc"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter, search and sort settings for a list view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: Filter,
    pub search: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ViewQuery {
    /// Filtered, searched and sorted copy of `tasks`
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let mut result: Vec<Task> = tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .filter(|task| matches_search(task, &self.search))
            .cloned()
            .collect();
        sort_tasks(&mut result, self.sort_by, self.sort_order);
        result
    }

    /// [`ViewQuery::apply`] partitioned by category
    pub fn grouped(&self, tasks: &[Task]) -> Vec<CategoryGroup> {
        group_by_category(&self.apply(tasks))
    }
}

/// Case-insensitive substring match on title, details and category.
///
/// A query that is blank after trimming matches everything.
pub fn matches_search(task: &Task, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.details.to_lowercase().contains(&needle)
        || task.category.to_lowercase().contains(&needle)
}

/// Ascending comparison under `sort_by`.
pub fn compare(a: &Task, b: &Task, sort_by: SortBy, now: DateTime<Local>) -> Ordering {
    match sort_by {
        SortBy::Deadline => dates::parse_local_date_at(&a.deadline, now)
            .cmp(&dates::parse_local_date_at(&b.deadline, now)),
        SortBy::Created => a.created_at.cmp(&b.created_at),
        SortBy::Alpha => a
            .title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.title.cmp(&b.title)),
        SortBy::Priority => a.priority.weight().cmp(&b.priority.weight()),
    }
}

/// Stable sort; `Desc` flips the comparator.
pub fn sort_tasks(tasks: &mut [Task], sort_by: SortBy, order: SortOrder) {
    let now = Local::now();
    tasks.sort_by(|a, b| {
        let ordering = compare(a, b, sort_by, now);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Tasks sharing a category, in list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub tasks: Vec<Task>,
}

/// Partition into category groups, ordered by first appearance.
pub fn group_by_category(tasks: &[Task]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for task in tasks {
        match groups.iter_mut().find(|group| group.category == task.category) {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(CategoryGroup {
                category: task.category.clone(),
                tasks: vec![task.clone()],
            }),
        }
    }
    groups
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub finished: usize,
    pub missed: usize,
    pub ongoing: usize,
    pub total: usize,
    /// Finished share, rounded percent
    pub progress: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        let finished = count(TaskStatus::Finished);
        let total = tasks.len();
        let progress = if total == 0 {
            0
        } else {
            ((finished as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            finished,
            missed: count(TaskStatus::Missed),
            ongoing: count(TaskStatus::Ongoing),
            total,
            progress,
        }
    }
}

/// Ongoing tasks due between `today` and `today + days`, both inclusive.
pub fn upcoming(tasks: &[Task], today: NaiveDate, days: u32) -> Vec<Task> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Ongoing)
        .filter(|task| {
            let deadline = dates::local_day_or(&task.deadline, today);
            deadline >= today && deadline <= horizon
        })
        .cloned()
        .collect()
}

/// How close an ongoing task is to its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineProximity {
    Overdue,
    /// Due today or tomorrow
    DueToday,
    /// Two to three days out
    DueSoon,
    Later,
}

impl DeadlineProximity {
    /// `None` for tasks that are not ongoing.
    pub fn of(task: &Task, today: NaiveDate) -> Option<Self> {
        if task.status != TaskStatus::Ongoing {
            return None;
        }
        let days = dates::days_until(dates::local_day_or(&task.deadline, today), today);
        Some(match days {
            d if d < 0 => DeadlineProximity::Overdue,
            0..=1 => DeadlineProximity::DueToday,
            2..=3 => DeadlineProximity::DueSoon,
            _ => DeadlineProximity::Later,
        })
    }
}

// =============================================================================
// Calendar
// =============================================================================

/// Tasks keyed by their raw deadline string
pub fn tasks_by_date(tasks: &[Task]) -> BTreeMap<String, Vec<Task>> {
    let mut map: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        map.entry(task.deadline.clone()).or_default().push(task.clone());
    }
    map
}

/// Tasks due on `day`
pub fn tasks_on(tasks: &[Task], day: NaiveDate) -> Vec<Task> {
    let key = dates::format_date(day);
    tasks
        .iter()
        .filter(|task| task.deadline == key)
        .cloned()
        .collect()
}

pub type Week = [NaiveDate; 7];

/// Whole Sunday-first weeks covering the month that contains `month`.
///
/// Fails for months whose grid would run past the supported date range.
pub fn month_grid(month: NaiveDate) -> Result<Vec<Week>> {
    let out_of_range = || Error::InvalidArgument("month out of range".to_string());
    let first = dates::month_start(month);
    let lead = u64::from(first.weekday().num_days_from_sunday());
    let mut start = first
        .checked_sub_days(Days::new(lead))
        .ok_or_else(out_of_range)?;

    let mut weeks = Vec::new();
    loop {
        let mut week = [start; 7];
        for (offset, slot) in week.iter_mut().enumerate() {
            *slot = start
                .checked_add_days(Days::new(offset as u64))
                .ok_or_else(out_of_range)?;
        }
        weeks.push(week);
        start = start.checked_add_days(Days::new(7)).ok_or_else(out_of_range)?;
        if start.month() != first.month() || start.year() != first.year() {
            break;
        }
    }
    Ok(weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskDraft, TaskPriority};
    use chrono::{TimeZone, Utc};

    fn task(title: &str, category: &str, deadline: &str) -> Task {
        TaskDraft::new(title, category, deadline).into_task(Utc::now())
    }

    fn prioritized(title: &str, priority: TaskPriority) -> Task {
        TaskDraft::new(title, "c", "2026-02-10")
            .priority(priority)
            .into_task(Utc::now())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn priority_sort_orders_by_severity() {
        let mut tasks = vec![
            prioritized("low", TaskPriority::Low),
            prioritized("urgent", TaskPriority::Urgent),
            prioritized("medium", TaskPriority::Medium),
        ];

        sort_tasks(&mut tasks, SortBy::Priority, SortOrder::Asc);
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["urgent", "medium", "low"]);

        sort_tasks(&mut tasks, SortBy::Priority, SortOrder::Desc);
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["low", "medium", "urgent"]);
    }

    #[test]
    fn deadline_sort_is_soonest_first() {
        let mut tasks = vec![
            task("b", "c", "2026-03-01"),
            task("a", "c", "2026-02-01"),
            task("c", "c", "2026-02-15"),
        ];
        sort_tasks(&mut tasks, SortBy::Deadline, SortOrder::Asc);
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["a", "c", "b"]);
    }

    #[test]
    fn created_and_alpha_sorts() {
        let mut older = task("zebra", "c", "2026-02-01");
        older.created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut newer = task("Apple", "c", "2026-02-01");
        newer.created_at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let mut tasks = vec![newer.clone(), older.clone()];

        sort_tasks(&mut tasks, SortBy::Created, SortOrder::Asc);
        assert_eq!(tasks[0].title, "zebra");

        sort_tasks(&mut tasks, SortBy::Alpha, SortOrder::Asc);
        assert_eq!(tasks[0].title, "Apple");
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let mut tasks = vec![
            task("first", "c", "2026-02-10"),
            task("second", "c", "2026-02-10"),
            task("third", "c", "2026-02-10"),
        ];
        sort_tasks(&mut tasks, SortBy::Priority, SortOrder::Desc);
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let t = task("Binary tree assignment", "DSA", "2026-02-12");
        assert!(matches_search(&t, "tree"));
        assert!(matches_search(&t, "TREE"));
        assert!(matches_search(&t, "dsa"));
        assert!(!matches_search(&t, "xyz"));
        assert!(matches_search(&t, "   "));
    }

    #[test]
    fn query_filters_then_searches() {
        let mut done = task("Binary tree assignment", "DSA", "2026-02-12");
        done.status = TaskStatus::Finished;
        let open = task("Tree traversal", "DSA", "2026-02-13");
        let tasks = vec![done, open];

        let query = ViewQuery {
            filter: Filter::Ongoing,
            search: "tree".to_string(),
            ..ViewQuery::default()
        };
        let result = query.apply(&tasks);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Tree traversal");
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let tasks = vec![
            task("a", "DSA", "2026-02-10"),
            task("b", "BSCS 1B", "2026-02-10"),
            task("c", "DSA", "2026-02-10"),
        ];
        let groups = group_by_category(&tasks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "DSA");
        assert_eq!(groups[0].tasks.len(), 2);
        assert_eq!(groups[1].category, "BSCS 1B");
    }

    #[test]
    fn stats_round_progress() {
        assert_eq!(TaskStats::from_tasks(&[]).progress, 0);

        let mut tasks = vec![
            task("a", "c", "2026-02-10"),
            task("b", "c", "2026-02-10"),
            task("c", "c", "2026-02-10"),
        ];
        tasks[0].status = TaskStatus::Finished;
        tasks[1].status = TaskStatus::Missed;
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.finished, 1);
        assert_eq!(stats.missed, 1);
        assert_eq!(stats.ongoing, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.progress, 33);
    }

    #[test]
    fn upcoming_window_is_inclusive() {
        let today = day(2026, 2, 10);
        let mut finished = task("done", "c", "2026-02-11");
        finished.status = TaskStatus::Finished;
        let tasks = vec![
            task("yesterday", "c", "2026-02-09"),
            task("today", "c", "2026-02-10"),
            task("week", "c", "2026-02-17"),
            task("later", "c", "2026-02-18"),
            finished,
        ];
        let titles: Vec<_> = upcoming(&tasks, today, 7)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["today", "week"]);
    }

    #[test]
    fn proximity_bands() {
        let today = day(2026, 2, 10);
        let at = |deadline: &str| DeadlineProximity::of(&task("t", "c", deadline), today);
        assert_eq!(at("2026-02-09"), Some(DeadlineProximity::Overdue));
        assert_eq!(at("2026-02-10"), Some(DeadlineProximity::DueToday));
        assert_eq!(at("2026-02-11"), Some(DeadlineProximity::DueToday));
        assert_eq!(at("2026-02-13"), Some(DeadlineProximity::DueSoon));
        assert_eq!(at("2026-02-14"), Some(DeadlineProximity::Later));

        let mut done = task("t", "c", "2026-02-10");
        done.status = TaskStatus::Finished;
        assert_eq!(DeadlineProximity::of(&done, today), None);
    }

    #[test]
    fn calendar_groups_by_deadline() {
        let tasks = vec![
            task("a", "c", "2026-02-10"),
            task("b", "c", "2026-02-10"),
            task("c", "c", "2026-02-11"),
        ];
        let map = tasks_by_date(&tasks);
        assert_eq!(map["2026-02-10"].len(), 2);
        assert_eq!(tasks_on(&tasks, day(2026, 2, 11)).len(), 1);
    }

    #[test]
    fn month_grid_covers_whole_weeks() {
        // February 2026 starts on a Sunday and ends on a Saturday.
        let grid = month_grid(day(2026, 2, 14)).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0][0], day(2026, 2, 1));
        assert_eq!(grid[3][6], day(2026, 2, 28));

        // March 2026 starts on a Sunday, ends on a Tuesday.
        let grid = month_grid(day(2026, 3, 1)).unwrap();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[4][6], day(2026, 4, 4));

        // January 2026 starts on a Thursday.
        let grid = month_grid(day(2026, 1, 20)).unwrap();
        assert_eq!(grid[0][0], day(2025, 12, 28));
        assert_eq!(grid[0][4], day(2026, 1, 1));
    }

    #[test]
    fn month_grid_rejects_months_at_the_date_limits() {
        for raw in ["+262142-12", "-262143-01"] {
            let month = dates::parse_month_arg(raw).unwrap();
            assert!(matches!(
                month_grid(month),
                Err(Error::InvalidArgument(msg)) if msg == "month out of range"
            ));
        }
    }
}
