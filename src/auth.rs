//! Session and profile directory state machine.
//!
//! ```text
//! Loading --check_auth--> Authenticated(user) | Unauthenticated
//! Unauthenticated --login--> Authenticated(user)
//! Authenticated --logout / delete own profile--> Unauthenticated
//! ```

use crate::db::Database;
use crate::error::{Error, Result};
use crate::profile::{validate_pin_change, User, UserPatch};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Session check has not run yet
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(User),
}

#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    state: AuthState,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Loading
    }

    /// Restore a saved session. Always leaves `Loading`.
    pub fn check_auth<S: KeyValueStore>(&mut self, db: &Database<S>) -> &AuthState {
        self.state = match db.get_user() {
            Some(user) => {
                tracing::debug!(username = %user.username, "restored session");
                AuthState::Authenticated(user)
            }
            None => AuthState::Unauthenticated,
        };
        &self.state
    }

    /// Log in, creating the profile on first use.
    ///
    /// A profile with a PIN needs the matching PIN. A new username needs a
    /// free slot in the profile directory.
    pub fn login<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        username: &str,
        pin: Option<&str>,
    ) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("Username is required".to_string()));
        }

        let existing = db.get_user_by_username(username);
        let is_new = existing.is_none();
        let user = match existing {
            Some(profile) => {
                if profile.has_pin() {
                    match pin.map(str::trim).filter(|pin| !pin.is_empty()) {
                        None => return Err(Error::PinRequired),
                        Some(given) if Some(given) != profile.pin.as_deref() => {
                            tracing::debug!(username = %profile.username, "rejected PIN");
                            return Err(Error::IncorrectPin);
                        }
                        Some(_) => {}
                    }
                }
                profile
            }
            None => {
                if !db.can_add_account() {
                    return Err(Error::AccountLimit {
                        limit: db.account_limit(),
                    });
                }
                User::new(username)
            }
        };

        // The session is written last so a failed login never leaves one behind.
        db.save_user_profile(&user)?;
        if let Err(err) = db.save_user(&user) {
            if is_new {
                if let Err(undo) = db.delete_user_profile(&user.username) {
                    tracing::warn!(username = %user.username, error = %undo, "could not undo profile");
                }
            }
            return Err(err);
        }
        tracing::info!(username = %user.username, "logged in");
        self.state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    /// End the session. The profile and its tasks stay.
    pub fn logout<S: KeyValueStore>(&mut self, db: &Database<S>) -> Result<()> {
        db.clear_user()?;
        if let Some(user) = self.user() {
            tracing::info!(username = %user.username, "logged out");
        }
        self.state = AuthState::Unauthenticated;
        Ok(())
    }

    /// Merge `patch` into the active user and persist session and profile.
    pub fn update_user<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        patch: &UserPatch,
    ) -> Result<User> {
        let previous = self.user().cloned().ok_or(Error::NotLoggedIn)?;
        let mut user = previous.clone();
        patch.apply(&mut user);
        db.save_user_profile(&user)?;
        if let Err(err) = db.save_user(&user) {
            if let Err(undo) = db.save_user_profile(&previous) {
                tracing::warn!(username = %user.username, error = %undo, "could not restore profile");
            }
            return Err(err);
        }
        self.state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    pub fn set_pin<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        pin: &str,
        confirm: &str,
    ) -> Result<User> {
        validate_pin_change(pin, confirm)?;
        self.update_user(db, &UserPatch::pin(Some(pin.to_string())))
    }

    pub fn clear_pin<S: KeyValueStore>(&mut self, db: &Database<S>) -> Result<User> {
        self.update_user(db, &UserPatch::pin(None))
    }

    /// Remove a profile and its tasks, logging out first if it is active.
    pub fn delete_profile<S: KeyValueStore>(
        &mut self,
        db: &Database<S>,
        username: &str,
    ) -> Result<()> {
        let username = username.trim();
        let is_active = self.user().is_some_and(|user| user.is(username));
        if !is_active && db.get_user_by_username(username).is_none() {
            return Err(Error::ProfileNotFound(username.to_string()));
        }

        if is_active {
            self.logout(db)?;
        }
        db.delete_user_profile(username)?;
        Ok(())
    }

    /// Profiles for the account picker
    pub fn profiles<S: KeyValueStore>(&self, db: &Database<S>) -> Vec<User> {
        db.get_user_profiles()
    }
}
