//! Application container
//!
//! Owns the persistence adapter, the auth store, the toast queue and, while
//! someone is logged in, the task store. Built once per process with
//! [`App::open`]; the task store is created on login and dropped on logout.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::auth::{AuthState, AuthStore};
use crate::config::Config;
use crate::dates;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::notify::{ToastMessage, Toasts};
use crate::profile::{User, UserPatch};
use crate::storage::{self, KeyValueStore};
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskPatch, TaskStatus};

pub const PROFILE_UPDATED: &str = "Profile updated";
pub const PIN_SAVED: &str = "PIN saved! You'll need it next time you log in.";
pub const PIN_DISABLED: &str = "PIN lock disabled";
pub const ACCOUNT_DELETED: &str = "Account deleted";

pub struct App<S = Box<dyn KeyValueStore>> {
    config: Config,
    db: Database<S>,
    auth: AuthStore,
    tasks: Option<TaskStore>,
    toasts: Toasts,
}

impl App {
    /// Open the configured backend under `data_dir` and restore the session.
    pub fn open(config: Config, data_dir: &Path) -> Self {
        let store = storage::open_store(&config, data_dir);
        Self::with_store(config, store)
    }
}

impl<S: KeyValueStore> App<S> {
    pub fn with_store(config: Config, store: S) -> Self {
        let db = Database::new(store).with_account_limit(config.accounts.limit);
        let toasts = Toasts::new(Duration::from_millis(config.notifications.toast_ttl_ms));
        let mut app = Self {
            config,
            db,
            auth: AuthStore::new(),
            tasks: None,
            toasts,
        };
        app.auth.check_auth(&app.db);
        app.start_session();
        app
    }

    fn start_session(&mut self) {
        self.tasks = self.auth.user().map(|user| {
            let mut store = TaskStore::new(
                user.username.clone(),
                &self.config.tasks,
                Duration::from_millis(self.config.notifications.search_debounce_ms),
            );
            store.load_tasks(&self.db);
            store
        });
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database<S> {
        &self.db
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    pub fn user(&self) -> Result<&User> {
        self.auth.user().ok_or(Error::NotLoggedIn)
    }

    pub fn tasks(&self) -> Result<&TaskStore> {
        self.tasks.as_ref().ok_or(Error::NotLoggedIn)
    }

    pub fn tasks_mut(&mut self) -> Result<&mut TaskStore> {
        self.tasks.as_mut().ok_or(Error::NotLoggedIn)
    }

    pub fn toasts(&self) -> &[ToastMessage] {
        self.toasts.active()
    }

    pub fn take_toasts(&mut self) -> Vec<ToastMessage> {
        self.toasts.drain()
    }

    pub fn expire_toasts(&mut self, now: Instant) -> Vec<ToastMessage> {
        self.toasts.expire(now)
    }

    pub fn dismiss_toast(&mut self, id: &str) -> bool {
        self.toasts.dismiss(id)
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    pub fn login(&mut self, username: &str, pin: Option<&str>) -> Result<User> {
        let user = self.auth.login(&self.db, username, pin)?;
        self.start_session();
        Ok(user)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.auth.logout(&self.db)?;
        self.tasks = None;
        Ok(())
    }

    /// Catch deadlines that passed while the app was in the background.
    pub fn on_visibility_regained(&mut self) -> bool {
        self.on_visibility_regained_on(dates::today())
    }

    pub fn on_visibility_regained_on(&mut self, today: NaiveDate) -> bool {
        match self.tasks.as_mut() {
            Some(store) => store.refresh_missed_on(&self.db, today),
            None => false,
        }
    }

    pub fn profiles(&self) -> Vec<User> {
        self.auth.profiles(&self.db)
    }

    pub fn update_display_name(&mut self, name: Option<String>) -> Result<User> {
        let user = self
            .auth
            .update_user(&self.db, &UserPatch::display_name(name))?;
        self.toasts.success(PROFILE_UPDATED);
        Ok(user)
    }

    pub fn set_pin(&mut self, pin: &str, confirm: &str) -> Result<User> {
        let user = self.auth.set_pin(&self.db, pin, confirm)?;
        self.toasts.success(PIN_SAVED);
        Ok(user)
    }

    pub fn clear_pin(&mut self) -> Result<User> {
        let user = self.auth.clear_pin(&self.db)?;
        self.toasts.info(PIN_DISABLED);
        Ok(user)
    }

    /// Delete a profile (the active one when `username` is `None`).
    ///
    /// Returns the deleted username.
    pub fn delete_profile(&mut self, username: Option<&str>) -> Result<String> {
        let username = match username {
            Some(name) => name.trim().to_string(),
            None => self.user()?.username.clone(),
        };
        self.auth.delete_profile(&self.db, &username)?;
        if !self.auth.is_authenticated() {
            self.tasks = None;
        }
        self.toasts.info(ACCOUNT_DELETED);
        Ok(username)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let store = self.tasks.as_mut().ok_or(Error::NotLoggedIn)?;
        store.add_task(&self.db, &mut self.toasts, draft)
    }

    /// Update by id or unique id prefix; returns the task as held in memory.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let store = self.tasks.as_mut().ok_or(Error::NotLoggedIn)?;
        let id = store.resolve_id(id)?;
        store.update_task(&self.db, &mut self.toasts, &id, patch)?;
        store
            .find(&id)
            .cloned()
            .ok_or(Error::TaskNotFound(id))
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Result<Task> {
        let store = self.tasks.as_mut().ok_or(Error::NotLoggedIn)?;
        let id = store.resolve_id(id)?;
        store.set_status(&self.db, &mut self.toasts, &id, status)?;
        store
            .find(&id)
            .cloned()
            .ok_or(Error::TaskNotFound(id))
    }

    /// Delete by id or unique id prefix; returns the removed task.
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        let store = self.tasks.as_mut().ok_or(Error::NotLoggedIn)?;
        let id = store.resolve_id(id)?;
        let task = store
            .find(&id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
        store.delete_task(&self.db, &mut self.toasts, &id)?;
        Ok(task)
    }
}
