//! tasklify task subcommands

use std::path::PathBuf;

use serde::Serialize;

use crate::dates;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{Task, TaskDraft, TaskPatch, TaskPriority, TaskStatus};
use crate::view::{CategoryGroup, DeadlineProximity, Filter, SortBy, SortOrder};

use super::open_app;

pub struct AddOptions {
    pub title: String,
    pub category: String,
    pub deadline: Option<String>,
    pub details: Option<String>,
    pub priority: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ListOptions {
    pub filter: String,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub group: bool,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct IdOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub details: Option<String>,
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct CategoriesOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Normalize a deadline argument to `YYYY-MM-DD`.
fn deadline_arg(value: Option<&str>) -> Result<String> {
    let today = dates::today();
    match value {
        Some(raw) => dates::parse_date_arg(raw, today).map(dates::format_date),
        None => Ok(dates::format_date(today)),
    }
}

/// One-line rendering used by list-style output
pub(crate) fn task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}][{}] {} {} ({}, due {})",
        task.status,
        task.priority.label(),
        short_id(&task.id),
        task.title,
        task.category,
        task.deadline
    );
    match DeadlineProximity::of(task, dates::today()) {
        Some(DeadlineProximity::DueToday) => line.push_str(" !due today"),
        Some(DeadlineProximity::DueSoon) => line.push_str(" !due soon"),
        _ => {}
    }
    line
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[derive(Serialize)]
struct TaskReport {
    task: Task,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let priority: TaskPriority = options.priority.parse()?;
    let deadline = deadline_arg(options.deadline.as_deref())?;

    let draft = TaskDraft::new(options.title, options.category, deadline)
        .details(options.details.unwrap_or_default())
        .priority(priority);
    let task = app.add_task(draft)?;

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Category", task.category.clone());
    human.push_summary("Deadline", task.deadline.clone());
    human.push_summary("Priority", task.priority.to_string());
    human.push_toasts(app.take_toasts());

    emit_success(options.output, "task add", &TaskReport { task }, Some(&human))
}

#[derive(Serialize)]
struct ListReport {
    filter: Filter,
    search: String,
    sort_by: SortBy,
    sort_order: SortOrder,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<Vec<Task>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<CategoryGroup>>,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let filter: Filter = options.filter.parse()?;
    let sort_by = options
        .sort
        .as_deref()
        .map(str::parse::<SortBy>)
        .transpose()?;
    let order = options
        .order
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()?;

    let store = app.tasks_mut()?;
    store.set_filter(filter);
    if let Some(search) = options.search {
        store.set_search_query(search);
    }
    if let Some(sort_by) = sort_by {
        store.set_sort_by(sort_by);
    }
    if let Some(order) = order {
        store.set_sort_order(order);
    }

    let store = app.tasks()?;
    let filtered = store.filtered_tasks();
    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", filtered.len().to_string());
    human.push_summary("Filter", filter.to_string());
    human.push_summary("Sort", format!("{} {}", store.sort_by(), store.sort_order()));
    if !store.search_query().trim().is_empty() {
        human.push_summary("Search", store.search_query().to_string());
    }

    let groups = if options.group {
        let groups = store.tasks_by_category();
        for group in &groups {
            human.push_detail(format!("{} ({})", group.category, group.tasks.len()));
            for task in &group.tasks {
                human.push_detail(format!("  {}", task_line(task)));
            }
        }
        Some(groups)
    } else {
        for task in &filtered {
            human.push_detail(task_line(task));
        }
        None
    };
    if filtered.is_empty() {
        human.push_next_step("tasklify task add <title> --category <category>");
    }

    let report = ListReport {
        filter,
        search: store.search_query().to_string(),
        sort_by: store.sort_by(),
        sort_order: store.sort_order(),
        total: filtered.len(),
        tasks: if groups.is_none() { Some(filtered) } else { None },
        groups,
    };
    emit_success(options.output, "task list", &report, Some(&human))
}

pub fn run_show(options: IdOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;
    let store = app.tasks()?;
    let id = store.resolve_id(&options.id)?;
    let task = store
        .find(&id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(task.title.clone());
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary("Category", task.category.clone());
    human.push_summary("Deadline", task.deadline.clone());
    human.push_summary("Created", task.created_at.to_rfc3339());
    human.push_summary("Updated", task.updated_at.to_rfc3339());
    if !task.details.is_empty() {
        human.push_detail(task.details.clone());
    }

    emit_success(options.output, "task show", &TaskReport { task }, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let patch = TaskPatch {
        title: options.title,
        details: options.details,
        deadline: options
            .deadline
            .as_deref()
            .map(|raw| deadline_arg(Some(raw)))
            .transpose()?,
        category: options.category,
        status: options
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?,
        priority: options
            .priority
            .as_deref()
            .map(str::parse::<TaskPriority>)
            .transpose()?,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change: pass at least one field".to_string(),
        ));
    }

    let task = app.update_task(&options.id, patch)?;

    let mut human = HumanOutput::new("Task updated");
    human.push_summary("ID", task.id.clone());
    human.push_detail(task_line(&task));
    human.push_toasts(app.take_toasts());
    emit_success(options.output, "task edit", &TaskReport { task }, Some(&human))
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let status: TaskStatus = options.status.parse()?;
    let task = app.set_status(&options.id, status)?;

    let mut human = HumanOutput::new(format!("Task marked as {status}"));
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_toasts(app.take_toasts());
    emit_success(options.output, "task status", &TaskReport { task }, Some(&human))
}

pub fn run_rm(options: IdOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let task = app.delete_task(&options.id)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_toasts(app.take_toasts());
    emit_success(options.output, "task rm", &TaskReport { task }, Some(&human))
}

#[derive(Serialize)]
struct CategoriesReport {
    categories: Vec<String>,
}

pub fn run_categories(options: CategoriesOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;
    app.user()?;
    let categories = app.db().get_categories();

    let mut human = HumanOutput::new("Categories");
    human.push_summary("Total", categories.len().to_string());
    for category in &categories {
        human.push_detail(category.clone());
    }
    emit_success(
        options.output,
        "task categories",
        &CategoriesReport { categories },
        Some(&human),
    )
}
