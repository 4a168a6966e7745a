//! Local user profiles.
//!
//! A profile is the session record and its entry in the profile directory.
//! PINs are stored and compared as plain text; they gate the login form and
//! nothing else.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of a profile PIN
pub const PIN_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            pin: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name when set, username otherwise
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn has_pin(&self) -> bool {
        self.pin.as_deref().is_some_and(|pin| !pin.is_empty())
    }

    pub fn is(&self, username: &str) -> bool {
        same_username(&self.username, username)
    }
}

/// Usernames compare case-insensitively.
pub fn same_username(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Partial profile update.
///
/// Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub display_name: Option<Option<String>>,
    pub pin: Option<Option<String>>,
}

impl UserPatch {
    pub fn display_name(name: Option<String>) -> Self {
        Self {
            display_name: Some(name),
            ..Self::default()
        }
    }

    pub fn pin(pin: Option<String>) -> Self {
        Self {
            pin: Some(pin),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.pin.is_none()
    }

    /// Merge into `user`. The username never changes.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.display_name {
            user.display_name = name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
        }
        if let Some(pin) = &self.pin {
            user.pin = pin.clone();
        }
    }
}

/// A PIN is exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::Validation("PIN must be exactly 4 digits".to_string()))
    }
}

/// Validate a new PIN and its confirmation.
pub fn validate_pin_change(pin: &str, confirm: &str) -> Result<()> {
    validate_pin(pin)?;
    if pin != confirm {
        return Err(Error::Validation("PINs don't match".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_record_omits_unset_fields() {
        let json = serde_json::to_string(&User::new("alice")).unwrap();
        assert_eq!(json, r#"{"username":"alice"}"#);

        let user = User::new("bob").with_display_name("Bob").with_pin("1234");
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["displayName"], "Bob");
        assert_eq!(value["pin"], "1234");
    }

    #[test]
    fn usernames_match_case_insensitively() {
        let user = User::new("Alice");
        assert!(user.is("alice"));
        assert!(user.is("ALICE"));
        assert!(!user.is("alicia"));
    }

    #[test]
    fn patch_trims_and_clears_display_name() {
        let mut user = User::new("alice").with_display_name("Al");
        UserPatch::display_name(Some("  Alice A. ".to_string())).apply(&mut user);
        assert_eq!(user.display_name.as_deref(), Some("Alice A."));
        assert_eq!(user.name(), "Alice A.");

        UserPatch::display_name(Some("   ".to_string())).apply(&mut user);
        assert!(user.display_name.is_none());
        assert_eq!(user.name(), "alice");
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut user = User::new("alice").with_pin("1234");
        let before = user.clone();
        let patch = UserPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut user);
        assert_eq!(user, before);
    }

    #[test]
    fn pin_rules() {
        assert!(validate_pin("0420").is_ok());
        assert_eq!(
            validate_pin("12a4").unwrap_err().to_string(),
            "PIN must be exactly 4 digits"
        );
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("").is_err());
        assert_eq!(
            validate_pin_change("1234", "4321").unwrap_err().to_string(),
            "PINs don't match"
        );
        assert!(validate_pin_change("1234", "1234").is_ok());
    }
}
