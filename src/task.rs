//! Task records for tasklify.
//!
//! Tasks are persisted as a JSON array per user (see [`crate::db`]). Field
//! names are camelCase on disk so existing task lists load unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Ongoing,
    Finished,
    Missed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Ongoing, TaskStatus::Finished, TaskStatus::Missed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ongoing => "ongoing",
            TaskStatus::Finished => "finished",
            TaskStatus::Missed => "missed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ongoing" => Ok(TaskStatus::Ongoing),
            "finished" | "done" => Ok(TaskStatus::Finished),
            "missed" => Ok(TaskStatus::Missed),
            _ => Err(Error::InvalidArgument(format!(
                "invalid status '{s}': must be ongoing, finished, or missed"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    /// Sort weight: most severe first.
    pub fn weight(&self) -> u8 {
        match self {
            TaskPriority::Urgent => 0,
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
        }
    }

    /// Short label used in compact listings
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Med",
            TaskPriority::High => "High",
            TaskPriority::Urgent => "URG",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" | "med" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" | "urg" => Ok(TaskPriority::Urgent),
            _ => Err(Error::InvalidArgument(format!(
                "invalid priority '{s}': must be low, medium, high, or urgent"
            ))),
        }
    }
}

/// Records written before priorities existed carry no field, or garbage.
fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<TaskPriority, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(|value| value.parse().ok())
        .unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
    /// `YYYY-MM-DD`, read as local midnight
    pub deadline: String,
    pub category: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Input for creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub details: String,
    pub deadline: String,
    pub category: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        deadline: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            deadline: deadline.into(),
            ..Self::default()
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Trim text fields and reject an empty title or category.
    pub fn validate(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(Error::Validation("Category is required".to_string()));
        }
        Ok(Self {
            title,
            category,
            details: self.details.trim().to_string(),
            deadline: self.deadline.trim().to_string(),
            ..self
        })
    }

    /// Stamp id and timestamps.
    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: new_task_id(),
            title: self.title,
            details: self.details,
            deadline: self.deadline,
            category: self.category,
            status: self.status,
            priority: self.priority,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub details: Option<String>,
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.deadline.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }

    /// Same rules as creation for the text fields that are present.
    pub fn validate(self) -> Result<Self> {
        let title = match self.title {
            Some(title) if title.trim().is_empty() => {
                return Err(Error::Validation("Title is required".to_string()))
            }
            other => other.map(|t| t.trim().to_string()),
        };
        let category = match self.category {
            Some(category) if category.trim().is_empty() => {
                return Err(Error::Validation("Category is required".to_string()))
            }
            other => other.map(|c| c.trim().to_string()),
        };
        Ok(Self {
            title,
            category,
            details: self.details.map(|d| d.trim().to_string()),
            deadline: self.deadline.map(|d| d.trim().to_string()),
            ..self
        })
    }

    /// Merge present fields into `task`. Does not touch `updated_at`.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(details) = &self.details {
            task.details = details.clone();
        }
        if let Some(deadline) = &self.deadline {
            task.deadline = deadline.clone();
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
    }
}

/// Resolve a full id or a unique id prefix.
pub fn resolve_task_id(tasks: &[Task], input: &str) -> Result<String> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    if let Some(task) = tasks.iter().find(|task| task.id.to_lowercase() == needle) {
        return Ok(task.id.clone());
    }

    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.id.to_lowercase().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [] => Err(Error::TaskNotFound(input.trim().to_string())),
        [task] => Ok(task.id.clone()),
        many => Err(Error::InvalidArgument(format!(
            "task id '{}' is ambiguous ({} matches)",
            input.trim(),
            many.len()
        ))),
    }
}

/// Fixed sample tasks inserted on a user's first load.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let samples = [
        (
            "Syntax review for quiz",
            "Review the syntax for the upcoming quiz on programming fundamentals.",
            "2026-02-15",
            "BSCS 1B",
            TaskStatus::Ongoing,
            TaskPriority::High,
        ),
        (
            "Binary tree assignment",
            "Complete the data structures assignment on binary trees.",
            "2026-02-12",
            "DSA",
            TaskStatus::Ongoing,
            TaskPriority::Urgent,
        ),
        (
            "Project submission guidelines",
            "Follow the new guidelines for the ITEC 105 project submission.",
            "2026-02-20",
            "ITEC 105",
            TaskStatus::Ongoing,
            TaskPriority::Medium,
        ),
        (
            "Submit lab report",
            "Lab report on network topologies due this week.",
            "2026-02-10",
            "BSCS 1B",
            TaskStatus::Finished,
            TaskPriority::Medium,
        ),
        (
            "Quiz preparation",
            "Prepare for the midterm quiz covering chapters 1-5.",
            "2026-02-08",
            "DSA",
            TaskStatus::Missed,
            TaskPriority::High,
        ),
        (
            "Research paper draft",
            "Write the first draft of the research paper on AI in education.",
            "2026-02-18",
            "ITEC 105",
            TaskStatus::Ongoing,
            TaskPriority::Low,
        ),
    ];

    samples
        .into_iter()
        .map(|(title, details, deadline, category, status, priority)| {
            TaskDraft::new(title, category, deadline)
                .details(details)
                .status(status)
                .priority(priority)
                .into_task(now)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        let mut task = TaskDraft::new("t", "c", "2026-02-10").into_task(Utc::now());
        task.id = id.to_string();
        task
    }

    #[test]
    fn legacy_record_without_priority_defaults_to_medium() {
        let json = r#"{
            "id": "1",
            "title": "Old task",
            "details": "",
            "deadline": "2026-02-10",
            "category": "DSA",
            "status": "ongoing",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
    }

    #[test]
    fn unknown_priority_defaults_to_medium() {
        let json = r#"{
            "id": "1", "title": "x", "details": "", "deadline": "2026-02-10",
            "category": "c", "status": "finished", "priority": "critical",
            "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Finished);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let task = task("abc");
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["status"], "ongoing");
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn draft_validation_trims_and_rejects_empty_fields() {
        let draft = TaskDraft::new("  Read  ", " DSA ", "2026-02-10")
            .details("  notes ")
            .validate()
            .unwrap();
        assert_eq!(draft.title, "Read");
        assert_eq!(draft.category, "DSA");
        assert_eq!(draft.details, "notes");

        let err = TaskDraft::new("   ", "DSA", "2026-02-10").validate().unwrap_err();
        assert_eq!(err.to_string(), "Title is required");

        let err = TaskDraft::new("Read", "  ", "2026-02-10").validate().unwrap_err();
        assert_eq!(err.to_string(), "Category is required");
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut task = task("abc");
        let patch = TaskPatch {
            title: Some("New".to_string()),
            priority: Some(TaskPriority::Urgent),
            ..TaskPatch::default()
        };
        patch.apply(&mut task);
        assert_eq!(task.title, "New");
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert_eq!(task.category, "c");
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn patch_rejects_blank_title() {
        let patch = TaskPatch {
            title: Some(" ".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(patch.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn resolve_task_id_accepts_unique_prefix() {
        let tasks = vec![task("abc123"), task("abd456"), task("xyz789")];
        assert_eq!(resolve_task_id(&tasks, "xyz").unwrap(), "xyz789");
        assert_eq!(resolve_task_id(&tasks, "ABC123").unwrap(), "abc123");
        assert!(matches!(
            resolve_task_id(&tasks, "ab"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_task_id(&tasks, "nope"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn sample_tasks_cover_every_status() {
        let tasks = sample_tasks(Utc::now());
        assert_eq!(tasks.len(), 6);
        for status in TaskStatus::ALL {
            assert!(tasks.iter().any(|t| t.status == status));
        }
        let mut ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn parse_status_and_priority() {
        assert_eq!("Finished".parse::<TaskStatus>().unwrap(), TaskStatus::Finished);
        assert!("closed".parse::<TaskStatus>().is_err());
        assert_eq!("URGENT".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
        assert!("P0".parse::<TaskPriority>().is_err());
    }
}
