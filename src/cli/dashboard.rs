//! tasklify dashboard

use std::path::PathBuf;

use serde::Serialize;

use crate::dates;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{Task, TaskStatus};
use crate::view::TaskStats;

use super::open_app;
use super::task::task_line;

/// Finished and missed previews are capped like the dashboard cards.
const PREVIEW_LIMIT: usize = 5;

pub struct DashboardOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct DashboardReport {
    stats: TaskStats,
    finished: Vec<Task>,
    missed: Vec<Task>,
    upcoming_days: u32,
    upcoming: Vec<Task>,
}

fn preview(tasks: &[Task], status: TaskStatus) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.status == status)
        .take(PREVIEW_LIMIT)
        .cloned()
        .collect()
}

pub fn run(options: DashboardOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;
    let user = app.user()?;
    let store = app.tasks()?;
    let upcoming_days = app.config().tasks.upcoming_days;

    let report = DashboardReport {
        stats: store.stats(),
        finished: preview(store.tasks(), TaskStatus::Finished),
        missed: preview(store.tasks(), TaskStatus::Missed),
        upcoming_days,
        upcoming: store.upcoming(dates::today()),
    };

    let stats = &report.stats;
    let mut human = HumanOutput::new(format!("Dashboard for {}", user.name()));
    human.push_summary("Progress", format!("{}%", stats.progress));
    human.push_summary("Finished", stats.finished.to_string());
    human.push_summary("Ongoing", stats.ongoing.to_string());
    human.push_summary("Missed", stats.missed.to_string());
    human.push_summary("Total", stats.total.to_string());

    human.push_detail(format!("Finished ({})", stats.finished));
    if report.finished.is_empty() {
        human.push_detail("  No finished tasks yet");
    }
    for task in &report.finished {
        human.push_detail(format!("  {}", task_line(task)));
    }

    human.push_detail(format!("Missed ({})", stats.missed));
    if report.missed.is_empty() {
        human.push_detail("  No missed tasks");
    }
    for task in &report.missed {
        human.push_detail(format!("  {}", task_line(task)));
    }

    human.push_detail(format!(
        "Reminders: next {upcoming_days} days ({})",
        report.upcoming.len()
    ));
    if report.upcoming.is_empty() {
        human.push_detail("  No upcoming deadlines");
    }
    for task in &report.upcoming {
        human.push_detail(format!("  {}", task_line(task)));
    }

    emit_success(options.output, "dashboard", &report, Some(&human))
}
