//! tasklify login, logout and whoami

use std::path::PathBuf;

use serde::Serialize;

use crate::auth::AuthState;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::profile::User;

use super::open_app;

pub struct LoginOptions {
    pub username: String,
    pub pin: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct SessionOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Profile as shown to the user; the PIN itself is never printed.
#[derive(Serialize)]
pub(crate) struct ProfileEntry {
    pub username: String,
    pub display_name: Option<String>,
    pub has_pin: bool,
}

impl From<&User> for ProfileEntry {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            has_pin: user.has_pin(),
        }
    }
}

#[derive(Serialize)]
struct LoginReport {
    user: ProfileEntry,
    tasks: usize,
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let user = app.login(&options.username, options.pin.as_deref())?;
    let tasks = app.tasks()?.tasks().len();

    let report = LoginReport {
        user: ProfileEntry::from(&user),
        tasks,
    };

    let mut human = HumanOutput::new(format!("Welcome, {}", user.name()));
    human.push_summary("Username", user.username.clone());
    human.push_summary("Tasks", tasks.to_string());
    human.push_toasts(app.take_toasts());
    human.push_next_step("tasklify dashboard");
    human.push_next_step("tasklify task add <title> --category <category>");

    emit_success(options.output, "login", &report, Some(&human))
}

#[derive(Serialize)]
struct LogoutReport {
    username: Option<String>,
}

pub fn run_logout(options: SessionOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let username = app.user().ok().map(|user| user.username.clone());
    app.logout()?;

    let header = match &username {
        Some(name) => format!("Logged out {name}"),
        None => "No active session".to_string(),
    };
    let human = HumanOutput::new(header);
    emit_success(
        options.output,
        "logout",
        &LogoutReport { username },
        Some(&human),
    )
}

#[derive(Serialize)]
struct WhoamiReport {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<ProfileEntry>,
}

pub fn run_whoami(options: SessionOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;

    let (report, human) = match app.auth_state() {
        AuthState::Authenticated(user) => {
            let mut human = HumanOutput::new(user.name().to_string());
            human.push_summary("Username", user.username.clone());
            human.push_summary("PIN", if user.has_pin() { "set" } else { "not set" });
            (
                WhoamiReport {
                    authenticated: true,
                    user: Some(ProfileEntry::from(user)),
                },
                human,
            )
        }
        AuthState::Loading | AuthState::Unauthenticated => {
            let mut human = HumanOutput::new("Not logged in");
            human.push_next_step("tasklify login <username>");
            (
                WhoamiReport {
                    authenticated: false,
                    user: None,
                },
                human,
            )
        }
    };

    emit_success(options.output, "whoami", &report, Some(&human))
}
