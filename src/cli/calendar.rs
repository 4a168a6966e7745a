//! tasklify calendar

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::Task;
use crate::view;

use super::open_app;
use super::task::task_line;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub struct CalendarOptions {
    pub month: Option<String>,
    pub day: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct DayCell {
    date: String,
    in_month: bool,
    tasks: usize,
}

#[derive(Serialize)]
struct CalendarReport {
    month: String,
    weeks: Vec<Vec<DayCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_tasks: Option<Vec<Task>>,
}

pub fn run(options: CalendarOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;
    let store = app.tasks()?;
    let today = dates::today();

    let selected = options
        .day
        .as_deref()
        .map(|raw| dates::parse_date_arg(raw, today))
        .transpose()?;
    let month = match (options.month.as_deref(), selected) {
        (Some(raw), _) => dates::parse_month_arg(raw)?,
        (None, Some(day)) => dates::month_start(day),
        (None, None) => dates::month_start(today),
    };

    let by_date = view::tasks_by_date(store.tasks());
    let weeks: Vec<Vec<DayCell>> = view::month_grid(month)?
        .iter()
        .map(|week| {
            week.iter()
                .map(|day| DayCell {
                    date: dates::format_date(*day),
                    in_month: day.month() == month.month(),
                    tasks: by_date
                        .get(&dates::format_date(*day))
                        .map_or(0, |tasks| tasks.len()),
                })
                .collect()
        })
        .collect();

    let mut human = HumanOutput::new(month.format("%B %Y").to_string());
    human.push_detail(WEEKDAYS.join("  "));
    for week in &weeks {
        human.push_detail(render_week(week, today));
    }

    let selected_tasks = selected.map(|day| view::tasks_on(store.tasks(), day));
    if let (Some(day), Some(tasks)) = (selected, &selected_tasks) {
        human.push_summary("Selected", dates::format_date(day));
        human.push_summary("Due", tasks.len().to_string());
        if tasks.is_empty() {
            human.push_detail(format!("No tasks due on {}", dates::format_date(day)));
        }
        for task in tasks {
            human.push_detail(task_line(task));
        }
    }

    let report = CalendarReport {
        month: month.format("%Y-%m").to_string(),
        weeks,
        selected_day: selected.map(dates::format_date),
        selected_tasks,
    };
    emit_success(options.output, "calendar", &report, Some(&human))
}

/// `12*` marks a day with deadlines, brackets mark today, dots pad other months.
fn render_week(week: &[DayCell], today: NaiveDate) -> String {
    let today = dates::format_date(today);
    week.iter()
        .map(|cell| {
            let day = cell.date.get(8..).unwrap_or("");
            let marker = if cell.tasks > 0 { "*" } else { " " };
            if !cell.in_month {
                " .  ".to_string()
            } else if cell.date == today {
                format!("[{day}]")
            } else {
                format!(" {day}{marker}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
