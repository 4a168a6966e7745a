//! Task store
//!
//! The in-memory task list for the active user plus the transient view
//! state around it (status tab, search text, sort, form and dialog flags).
//! Every mutation goes through the [`Database`] and then reloads the list
//! from storage. When a save fails the attempted change is kept in memory
//! and an error toast is raised; memory and storage then disagree until the
//! next load.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};

use crate::config::TasksConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::notify::{Debouncer, Toasts};
use crate::storage::KeyValueStore;
use crate::task::{self, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::view::{self, CategoryGroup, Filter, SortBy, SortOrder, TaskStats, ViewQuery};

pub const SAVE_TASK_FAILED: &str = "Storage full: could not save task";
pub const SAVE_CHANGES_FAILED: &str = "Storage full: could not save changes";
pub const TASK_CREATED: &str = "Task created successfully";

#[derive(Debug, Clone)]
pub struct TaskStore {
    username: String,
    tasks: Vec<Task>,
    query: ViewQuery,
    search_input: Debouncer<String>,
    show_add_form: bool,
    editing_task: Option<Task>,
    confirm_delete: Option<Task>,
    seed_sample_data: bool,
    upcoming_days: u32,
}

impl TaskStore {
    pub fn new(username: impl Into<String>, settings: &TasksConfig, debounce: Duration) -> Self {
        Self {
            username: username.into(),
            tasks: Vec::new(),
            query: ViewQuery {
                sort_by: settings.default_sort,
                sort_order: settings.default_order,
                ..ViewQuery::default()
            },
            search_input: Debouncer::new(debounce),
            show_add_form: false,
            editing_task: None,
            confirm_delete: None,
            seed_sample_data: settings.seed_sample_data,
            upcoming_days: settings.upcoming_days,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Migrate, seed on first load, sweep missed deadlines, then read.
    pub fn load_tasks<S: KeyValueStore>(&mut self, db: &Database<S>) {
        self.load_tasks_on(db, crate::dates::today());
    }

    pub fn load_tasks_on<S: KeyValueStore>(&mut self, db: &Database<S>, today: NaiveDate) {
        db.migrate_user_tasks();

        if !db.has_been_seeded(&self.username) {
            if self.seed_sample_data {
                db.seed_sample_data();
            }
            if let Err(err) = db.mark_as_seeded(&self.username) {
                tracing::warn!(username = %self.username, error = %err, "could not record seeding");
            }
        }

        db.auto_detect_missed_on(today);
        self.tasks = db.get_tasks();
        tracing::debug!(username = %self.username, count = self.tasks.len(), "loaded tasks");
    }

    /// Validate and create a task.
    ///
    /// Validation errors return `Err` before anything is written. A failed
    /// save keeps the task in memory and raises an error toast.
    pub fn add_task<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        toasts: &mut Toasts,
        draft: TaskDraft,
    ) -> Result<Task> {
        let task = draft.validate()?.into_task(Utc::now());

        if db.add_task(task.clone()) {
            self.tasks = db.get_tasks();
            toasts.success(TASK_CREATED);
        } else {
            toasts.error(SAVE_TASK_FAILED);
            self.tasks.push(task.clone());
        }
        self.show_add_form = false;
        Ok(task)
    }

    /// Apply `patch` to a task. `Ok(false)` when storage rejected the write.
    pub fn update_task<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        toasts: &mut Toasts,
        id: &str,
        patch: TaskPatch,
    ) -> Result<bool> {
        let patch = patch.validate()?;
        if self.find(id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        let saved = db.update_task(id, &patch);
        if saved {
            self.tasks = db.get_tasks();
        } else {
            toasts.error(SAVE_CHANGES_FAILED);
            if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
                patch.apply(task);
                task.updated_at = Utc::now();
            }
        }
        self.editing_task = None;
        Ok(saved)
    }

    /// Change status and announce it.
    pub fn set_status<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        toasts: &mut Toasts,
        id: &str,
        status: TaskStatus,
    ) -> Result<bool> {
        let saved = self.update_task(db, toasts, id, TaskPatch::status(status))?;
        if saved {
            toasts.info(format!("Task marked as {status}"));
        }
        Ok(saved)
    }

    /// Delete a task and close any pending delete confirmation.
    pub fn delete_task<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        toasts: &mut Toasts,
        id: &str,
    ) -> Result<bool> {
        if self.find(id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        let saved = db.delete_task(id);
        if saved {
            self.tasks = db.get_tasks();
        } else {
            toasts.error(SAVE_CHANGES_FAILED);
            self.tasks.retain(|task| task.id != id);
        }
        self.confirm_delete = None;
        Ok(saved)
    }

    /// Re-run missed detection, reloading only when something was saved.
    pub fn refresh_missed<S: KeyValueStore>(&mut self, db: &Database<S>) -> bool {
        self.refresh_missed_on(db, crate::dates::today())
    }

    pub fn refresh_missed_on<S: KeyValueStore>(&mut self, db: &Database<S>, today: NaiveDate) -> bool {
        if db.auto_detect_missed_on(today) {
            self.tasks = db.get_tasks();
            true
        } else {
            false
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Full id for an id or unique id prefix
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        task::resolve_task_id(&self.tasks, input)
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn filter(&self) -> Filter {
        self.query.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.query.filter = filter;
    }

    pub fn search_query(&self) -> &str {
        &self.query.search
    }

    /// Apply a search query immediately, dropping any pending typed input.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_input.flush();
        self.query.search = query.into();
    }

    /// Record typed search input; it applies once [`TaskStore::tick`] sees
    /// the debounce delay pass without further typing.
    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search_input.push(text.into(), now);
    }

    /// Apply debounced search input. Returns whether the query changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search_input.ready(now) {
            Some(text) if text != self.query.search => {
                self.query.search = text;
                true
            }
            _ => false,
        }
    }

    pub fn sort_by(&self) -> SortBy {
        self.query.sort_by
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.query.sort_by = sort_by;
    }

    pub fn sort_order(&self) -> SortOrder {
        self.query.sort_order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.query.sort_order = order;
    }

    pub fn toggle_sort_order(&mut self) {
        self.query.sort_order = self.query.sort_order.toggled();
    }

    pub fn show_add_form(&self) -> bool {
        self.show_add_form
    }

    pub fn set_show_add_form(&mut self, show: bool) {
        self.show_add_form = show;
    }

    pub fn editing_task(&self) -> Option<&Task> {
        self.editing_task.as_ref()
    }

    pub fn set_editing_task(&mut self, task: Option<Task>) {
        self.editing_task = task;
    }

    pub fn confirm_delete(&self) -> Option<&Task> {
        self.confirm_delete.as_ref()
    }

    pub fn set_confirm_delete(&mut self, task: Option<Task>) {
        self.confirm_delete = task;
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    pub fn filtered_tasks(&self) -> Vec<Task> {
        self.query.apply(&self.tasks)
    }

    pub fn tasks_by_category(&self) -> Vec<CategoryGroup> {
        self.query.grouped(&self.tasks)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Ongoing tasks inside the configured reminder window
    pub fn upcoming(&self, today: NaiveDate) -> Vec<Task> {
        view::upcoming(&self.tasks, today, self.upcoming_days)
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.tasks.iter().map(|task| task.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use crate::profile::User;
    use crate::storage::{MemoryStore, StorageKey};

    fn setup(username: &str) -> (Database<MemoryStore>, TaskStore, Toasts) {
        let db = Database::new(MemoryStore::new());
        db.save_user(&User::new(username)).unwrap();
        let store = TaskStore::new(username, &TasksConfig::default(), Duration::from_millis(300));
        (db, store, Toasts::default())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_load_seeds_once() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        assert_eq!(store.tasks().len(), 6);
        assert!(db.has_been_seeded("alice"));

        for task in store.tasks().to_vec() {
            store.delete_task(&db, &mut toasts, &task.id).unwrap();
        }
        store.load_tasks_on(&db, day(2026, 2, 1));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn seeding_can_be_disabled() {
        let db = Database::new(MemoryStore::new());
        db.save_user(&User::new("bob")).unwrap();
        let settings = TasksConfig {
            seed_sample_data: false,
            ..TasksConfig::default()
        };
        let mut store = TaskStore::new("bob", &settings, Duration::ZERO);
        store.load_tasks(&db);
        assert!(store.tasks().is_empty());
        assert!(db.has_been_seeded("bob"));
    }

    #[test]
    fn load_marks_overdue_tasks_missed() {
        let (db, mut store, _) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 13));

        let missed: Vec<_> = store
            .tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::Missed)
            .map(|t| t.title.as_str())
            .collect();
        // Binary tree assignment was due on the 12th.
        assert!(missed.contains(&"Binary tree assignment"));
        assert!(missed.contains(&"Quiz preparation"));
        assert!(!missed.contains(&"Syntax review for quiz"));
    }

    #[test]
    fn add_task_validates_before_writing() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));

        let err = store
            .add_task(&db, &mut toasts, TaskDraft::new(" ", "DSA", "2026-03-01"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(db.get_tasks().len(), 6);
        assert!(toasts.is_empty());
    }

    #[test]
    fn add_task_persists_and_reloads() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        store.set_show_add_form(true);

        let task = store
            .add_task(&db, &mut toasts, TaskDraft::new("Essay", "ENG", "2026-03-01"))
            .unwrap();
        assert_eq!(store.tasks().len(), 7);
        assert!(db.get_tasks().iter().any(|t| t.id == task.id));
        assert!(!store.show_add_form());
        assert_eq!(toasts.active()[0].text, TASK_CREATED);
    }

    #[test]
    fn failed_save_keeps_attempt_in_memory() {
        let db = Database::new(MemoryStore::with_quota(64));
        db.store()
            .insert_raw(&StorageKey::Session, r#"{"username":"alice"}"#);
        let settings = TasksConfig {
            seed_sample_data: false,
            ..TasksConfig::default()
        };
        let mut store = TaskStore::new("alice", &settings, Duration::ZERO);
        let mut toasts = Toasts::default();
        store.load_tasks(&db);

        let task = store
            .add_task(
                &db,
                &mut toasts,
                TaskDraft::new("A title long enough to overflow", "DSA", "2026-03-01"),
            )
            .unwrap();
        assert!(store.find(&task.id).is_some());
        assert!(db.get_tasks().is_empty());
        assert_eq!(toasts.active()[0].severity, Severity::Error);
        assert_eq!(toasts.active()[0].text, SAVE_TASK_FAILED);
    }

    #[test]
    fn set_status_announces_change() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        let id = store.tasks()[0].id.clone();

        assert!(store
            .set_status(&db, &mut toasts, &id, TaskStatus::Finished)
            .unwrap());
        assert_eq!(store.find(&id).unwrap().status, TaskStatus::Finished);
        let last = toasts.active().last().unwrap();
        assert_eq!(last.text, "Task marked as finished");
        assert_eq!(last.severity, Severity::Info);
    }

    #[test]
    fn update_unknown_task_is_an_error() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        let err = store
            .update_task(&db, &mut toasts, "nope", TaskPatch::status(TaskStatus::Missed))
            .unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[test]
    fn delete_clears_confirmation() {
        let (db, mut store, mut toasts) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        let victim = store.tasks()[0].clone();
        store.set_confirm_delete(Some(victim.clone()));

        assert!(store.delete_task(&db, &mut toasts, &victim.id).unwrap());
        assert!(store.confirm_delete().is_none());
        assert!(store.find(&victim.id).is_none());
    }

    #[test]
    fn refresh_missed_reloads_only_on_change() {
        let (db, mut store, _) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        assert!(!store.refresh_missed_on(&db, day(2026, 2, 1)));
        assert!(store.refresh_missed_on(&db, day(2026, 2, 16)));
        assert!(!store.refresh_missed_on(&db, day(2026, 2, 16)));
    }

    #[test]
    fn typed_search_applies_after_debounce() {
        let (db, mut store, _) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));
        let start = Instant::now();

        store.type_search("tr", start);
        store.type_search("tree", start + Duration::from_millis(100));
        assert!(!store.tick(start + Duration::from_millis(200)));
        assert_eq!(store.filtered_tasks().len(), 6);

        assert!(store.tick(start + Duration::from_millis(400)));
        assert_eq!(store.search_query(), "tree");
        let titles: Vec<_> = store.filtered_tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["Binary tree assignment"]);
    }

    #[test]
    fn views_follow_sort_and_filter() {
        let (db, mut store, _) = setup("alice");
        store.load_tasks_on(&db, day(2026, 2, 1));

        store.set_filter(Filter::Ongoing);
        store.set_sort_by(SortBy::Priority);
        let first = &store.filtered_tasks()[0];
        assert_eq!(first.title, "Binary tree assignment");

        store.toggle_sort_order();
        assert_eq!(store.sort_order(), SortOrder::Desc);
        assert_eq!(store.filtered_tasks()[0].title, "Research paper draft");

        let groups = store.tasks_by_category();
        assert!(groups.iter().all(|g| !g.tasks.is_empty()));
        assert_eq!(store.categories(), ["BSCS 1B", "DSA", "ITEC 105"]);
        assert_eq!(store.stats().total, 6);
        assert_eq!(store.upcoming(day(2026, 2, 10)).len(), 2);
    }
}
