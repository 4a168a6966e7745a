//! Persistence adapter
//!
//! A pass-through over a [`KeyValueStore`] with no cache of its own. The task
//! namespace is chosen by the active session record, so whoever is logged in
//! decides which `tasklify_tasks_<username>` document is read and written.
//!
//! Task operations follow the local-storage contract: reads that fail or hit
//! corrupt data behave as empty and are logged, writes report `false` instead
//! of erroring. Session and profile writes return [`Result`] so the auth layer
//! can surface them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::MAX_ACCOUNTS;
use crate::dates;
use crate::error::Result;
use crate::profile::{same_username, User};
use crate::storage::{KeyValueStore, StorageKey};
use crate::task::{sample_tasks, Task, TaskPatch, TaskStatus};

/// Persistence adapter over a key-value backend
#[derive(Debug)]
pub struct Database<S> {
    store: S,
    account_limit: usize,
}

impl<S: KeyValueStore> Database<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            account_limit: MAX_ACCOUNTS,
        }
    }

    /// Cap the profile directory below the default of five.
    pub fn with_account_limit(mut self, limit: usize) -> Self {
        self.account_limit = limit.clamp(1, MAX_ACCOUNTS);
        self
    }

    pub fn account_limit(&self) -> usize {
        self.account_limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Raw document access
    // =========================================================================

    fn read_json<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "storage read failed; treating as empty");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "corrupt document; treating as empty");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &StorageKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    /// Username of the active session, if any
    fn active_username(&self) -> Option<String> {
        self.get_user()
            .map(|user| user.username)
            .filter(|name| !name.is_empty())
    }

    /// Task list key for the active session; the legacy key when logged out.
    fn tasks_key(&self) -> StorageKey {
        match self.active_username() {
            Some(username) => StorageKey::tasks_for(&username),
            None => StorageKey::legacy_tasks(),
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// All tasks of the active user; empty when absent or unreadable.
    pub fn get_tasks(&self) -> Vec<Task> {
        self.read_json(&self.tasks_key()).unwrap_or_default()
    }

    /// Persist the full list. `false` on any failure.
    pub fn save_tasks(&self, tasks: &[Task]) -> bool {
        let key = self.tasks_key();
        match self.write_json(&key, tasks) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(key = %key, error = %err, "failed to save tasks");
                false
            }
        }
    }

    pub fn add_task(&self, task: Task) -> bool {
        let mut tasks = self.get_tasks();
        tasks.push(task);
        self.save_tasks(&tasks)
    }

    /// Merge `patch` into the task with `id` and stamp `updatedAt`.
    ///
    /// `false` when the id is unknown or the save fails.
    pub fn update_task(&self, id: &str, patch: &TaskPatch) -> bool {
        self.update_task_at(id, patch, Utc::now())
    }

    pub fn update_task_at(&self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> bool {
        let mut tasks = self.get_tasks();
        let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
            tracing::debug!(task_id = id, "update for unknown task");
            return false;
        };
        patch.apply(task);
        task.updated_at = now;
        self.save_tasks(&tasks)
    }

    pub fn delete_task(&self, id: &str) -> bool {
        let tasks: Vec<Task> = self
            .get_tasks()
            .into_iter()
            .filter(|task| task.id != id)
            .collect();
        self.save_tasks(&tasks)
    }

    /// Copy the legacy global list into the user's key if the user has none.
    ///
    /// Returns whether a copy was made.
    pub fn migrate_user_tasks(&self) -> bool {
        let Some(username) = self.active_username() else {
            return false;
        };
        let user_key = StorageKey::tasks_for(&username);
        match self.store.contains(&user_key) {
            Ok(false) => {}
            Ok(true) => return false,
            Err(err) => {
                tracing::warn!(key = %user_key, error = %err, "skipping task migration");
                return false;
            }
        }

        let legacy = match self.store.get(&StorageKey::legacy_tasks()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(error = %err, "legacy task list unreadable");
                return false;
            }
        };
        match self.store.set(&user_key, &legacy) {
            Ok(()) => {
                tracing::info!(username = %username, "migrated legacy task list");
                true
            }
            Err(err) => {
                tracing::error!(key = %user_key, error = %err, "task migration failed");
                false
            }
        }
    }

    /// Flip overdue ongoing tasks to missed, as of the current local day.
    pub fn auto_detect_missed(&self) -> bool {
        self.auto_detect_missed_on(dates::today())
    }

    /// Flip every ongoing task whose deadline falls before `today` to missed.
    ///
    /// Saves once if anything changed and returns whether that save succeeded.
    pub fn auto_detect_missed_on(&self, today: NaiveDate) -> bool {
        let mut tasks = self.get_tasks();
        let now = Utc::now();
        let mut changed = 0usize;

        for task in tasks.iter_mut().filter(|t| t.status == TaskStatus::Ongoing) {
            if dates::local_day_or(&task.deadline, today) < today {
                task.status = TaskStatus::Missed;
                task.updated_at = now;
                changed += 1;
            }
        }

        if changed == 0 {
            return false;
        }
        tracing::info!(count = changed, "marked overdue tasks as missed");
        self.save_tasks(&tasks)
    }

    /// Distinct categories, sorted.
    pub fn get_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .get_tasks()
            .into_iter()
            .map(|task| task.category)
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn get_user(&self) -> Option<User> {
        self.read_json(&StorageKey::Session)
    }

    pub fn save_user(&self, user: &User) -> Result<()> {
        self.write_json(&StorageKey::Session, user)
    }

    pub fn clear_user(&self) -> Result<()> {
        self.store.remove(&StorageKey::Session)
    }

    // =========================================================================
    // Profile directory
    // =========================================================================

    pub fn get_user_profiles(&self) -> Vec<User> {
        self.read_json(&StorageKey::Profiles).unwrap_or_default()
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.get_user_profiles()
            .into_iter()
            .find(|profile| profile.is(username))
    }

    /// Insert or replace the profile with the same (case-insensitive) username.
    pub fn save_user_profile(&self, user: &User) -> Result<()> {
        let mut profiles = self.get_user_profiles();
        match profiles.iter_mut().find(|profile| profile.is(&user.username)) {
            Some(existing) => *existing = user.clone(),
            None => profiles.push(user.clone()),
        }
        self.write_json(&StorageKey::Profiles, &profiles)
    }

    /// Remove a profile together with its task list and seeded marker.
    ///
    /// Returns whether a directory entry was removed.
    pub fn delete_user_profile(&self, username: &str) -> Result<bool> {
        let mut profiles = self.get_user_profiles();
        let canonical = profiles
            .iter()
            .find(|profile| profile.is(username))
            .map(|profile| profile.username.clone());
        profiles.retain(|profile| !profile.is(username));

        if canonical.is_some() {
            self.write_json(&StorageKey::Profiles, &profiles)?;
        }

        let owner = canonical.as_deref().unwrap_or(username);
        self.store.remove(&StorageKey::tasks_for(owner))?;

        let mut seeded = self.seeded_users();
        let before = seeded.len();
        seeded.retain(|name| !same_username(name, owner));
        if seeded.len() != before {
            self.write_json(&StorageKey::SeededUsers, &seeded)?;
        }

        tracing::info!(username = owner, removed = canonical.is_some(), "deleted profile");
        Ok(canonical.is_some())
    }

    /// True while the directory holds fewer profiles than the limit.
    pub fn can_add_account(&self) -> bool {
        self.get_user_profiles().len() < self.account_limit
    }

    // =========================================================================
    // Sample data
    // =========================================================================

    fn seeded_users(&self) -> Vec<String> {
        self.read_json(&StorageKey::SeededUsers).unwrap_or_default()
    }

    pub fn has_been_seeded(&self, username: &str) -> bool {
        self.seeded_users()
            .iter()
            .any(|name| same_username(name, username))
    }

    pub fn mark_as_seeded(&self, username: &str) -> Result<()> {
        let mut seeded = self.seeded_users();
        if seeded.iter().any(|name| same_username(name, username)) {
            return Ok(());
        }
        seeded.push(username.to_string());
        self.write_json(&StorageKey::SeededUsers, &seeded)
    }

    /// Insert the sample tasks if the active list is empty.
    ///
    /// Returns whether they were saved.
    pub fn seed_sample_data(&self) -> bool {
        if !self.get_tasks().is_empty() {
            return false;
        }
        let saved = self.save_tasks(&sample_tasks(Utc::now()));
        if saved {
            tracing::debug!("seeded sample tasks");
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::task::TaskDraft;

    fn db_for(username: &str) -> Database<MemoryStore> {
        let db = Database::new(MemoryStore::new());
        db.save_user(&User::new(username)).unwrap();
        db
    }

    #[test]
    fn tasks_are_namespaced_by_session() {
        let db = db_for("alice");
        assert!(db.add_task(TaskDraft::new("a", "c", "2026-02-10").into_task(Utc::now())));

        db.save_user(&User::new("bob")).unwrap();
        assert!(db.get_tasks().is_empty());

        db.save_user(&User::new("alice")).unwrap();
        assert_eq!(db.get_tasks().len(), 1);
        assert!(db.store().contains(&StorageKey::tasks_for("alice")).unwrap());
    }

    #[test]
    fn corrupt_task_list_reads_as_empty() {
        let db = db_for("alice");
        db.store()
            .insert_raw(&StorageKey::tasks_for("alice"), "{not json");
        assert!(db.get_tasks().is_empty());
    }

    #[test]
    fn unavailable_store_behaves_as_fresh() {
        let db = Database::new(MemoryStore::unavailable());
        assert!(db.get_user().is_none());
        assert!(db.get_tasks().is_empty());
        assert!(!db.save_tasks(&[]));
        assert!(db.can_add_account());
    }

    #[test]
    fn update_unknown_id_returns_false() {
        let db = db_for("alice");
        assert!(!db.update_task("missing", &TaskPatch::status(TaskStatus::Finished)));
    }

    #[test]
    fn delete_task_removes_only_that_task() {
        let db = db_for("alice");
        let keep = TaskDraft::new("keep", "c", "2026-02-10").into_task(Utc::now());
        let drop = TaskDraft::new("drop", "c", "2026-02-10").into_task(Utc::now());
        db.save_tasks(&[keep.clone(), drop.clone()]);

        assert!(db.delete_task(&drop.id));
        assert_eq!(db.get_tasks(), vec![keep]);
    }

    #[test]
    fn migration_copies_legacy_list_once() {
        let db = db_for("alice");
        db.store()
            .insert_raw(&StorageKey::legacy_tasks(), "[]");
        assert!(db.migrate_user_tasks());
        assert_eq!(
            db.store().get(&StorageKey::tasks_for("alice")).unwrap().as_deref(),
            Some("[]")
        );
        // User key exists now.
        assert!(!db.migrate_user_tasks());
    }

    #[test]
    fn migration_skipped_without_session_or_legacy_data() {
        let db = Database::new(MemoryStore::new());
        db.store().insert_raw(&StorageKey::legacy_tasks(), "[]");
        assert!(!db.migrate_user_tasks());

        let db = db_for("bob");
        assert!(!db.migrate_user_tasks());
        assert!(!db.store().contains(&StorageKey::tasks_for("bob")).unwrap());
    }

    #[test]
    fn seeding_only_fills_empty_list() {
        let db = db_for("alice");
        assert!(db.seed_sample_data());
        assert_eq!(db.get_tasks().len(), 6);
        assert!(!db.seed_sample_data());
        assert_eq!(db.get_tasks().len(), 6);
    }

    #[test]
    fn seeded_marker_is_case_insensitive_and_unique() {
        let db = db_for("alice");
        assert!(!db.has_been_seeded("alice"));
        db.mark_as_seeded("alice").unwrap();
        db.mark_as_seeded("ALICE").unwrap();
        assert!(db.has_been_seeded("Alice"));
        assert_eq!(db.seeded_users(), vec!["alice".to_string()]);
    }

    #[test]
    fn profile_upsert_is_case_insensitive() {
        let db = Database::new(MemoryStore::new());
        db.save_user_profile(&User::new("Alice")).unwrap();
        db.save_user_profile(&User::new("Alice").with_pin("1234")).unwrap();

        let profiles = db.get_user_profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(
            db.get_user_by_username("alice").and_then(|u| u.pin).as_deref(),
            Some("1234")
        );
    }

    #[test]
    fn deleting_profile_purges_tasks_and_marker() {
        let db = db_for("alice");
        db.save_user_profile(&User::new("alice")).unwrap();
        db.seed_sample_data();
        db.mark_as_seeded("alice").unwrap();

        assert!(db.delete_user_profile("ALICE").unwrap());
        assert!(db.get_user_by_username("alice").is_none());
        assert!(!db.store().contains(&StorageKey::tasks_for("alice")).unwrap());
        assert!(!db.has_been_seeded("alice"));
        assert!(!db.delete_user_profile("alice").unwrap());
    }

    #[test]
    fn account_limit_honours_configured_cap() {
        let db = Database::new(MemoryStore::new()).with_account_limit(2);
        db.save_user_profile(&User::new("a")).unwrap();
        assert!(db.can_add_account());
        db.save_user_profile(&User::new("b")).unwrap();
        assert!(!db.can_add_account());

        let db = Database::new(MemoryStore::new()).with_account_limit(50);
        assert_eq!(db.account_limit(), MAX_ACCOUNTS);
    }

    #[test]
    fn clear_user_ends_session() {
        let db = db_for("alice");
        db.clear_user().unwrap();
        assert!(db.get_user().is_none());
    }
}
