//! tasklify profile subcommands

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

use super::open_app;
use super::session::ProfileEntry;

pub struct ProfileOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct UpdateOptions {
    pub display_name: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct SetPinOptions {
    pub pin: String,
    pub confirm: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct DeleteOptions {
    pub username: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct ListReport {
    profiles: Vec<ProfileEntry>,
    active: Option<String>,
    used: usize,
    limit: usize,
}

pub fn run_list(options: ProfileOptions) -> Result<()> {
    let app = open_app(options.data_dir)?;
    let profiles = app.profiles();
    let active = app.user().ok().map(|user| user.username.clone());
    let limit = app.db().account_limit();

    let mut human = HumanOutput::new("Profiles");
    human.push_summary("Accounts", format!("{}/{} accounts used", profiles.len(), limit));
    for profile in &profiles {
        let marker = if active.as_deref().is_some_and(|name| profile.is(name)) {
            "*"
        } else {
            " "
        };
        let lock = if profile.has_pin() { " [pin]" } else { "" };
        match &profile.display_name {
            Some(name) => human.push_detail(format!("{marker} {} ({name}){lock}", profile.username)),
            None => human.push_detail(format!("{marker} {}{lock}", profile.username)),
        }
    }

    let report = ListReport {
        used: profiles.len(),
        profiles: profiles.iter().map(ProfileEntry::from).collect(),
        active,
        limit,
    };
    emit_success(options.output, "profile list", &report, Some(&human))
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let user = app.update_display_name(Some(options.display_name))?;

    let mut human = HumanOutput::new("Profile updated");
    human.push_summary("Display name", user.name().to_string());
    human.push_toasts(app.take_toasts());
    emit_success(
        options.output,
        "profile update",
        &ProfileEntry::from(&user),
        Some(&human),
    )
}

pub fn run_set_pin(options: SetPinOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let user = app.set_pin(&options.pin, &options.confirm)?;

    let mut human = HumanOutput::new("PIN set");
    human.push_summary("Username", user.username.clone());
    human.push_toasts(app.take_toasts());
    emit_success(
        options.output,
        "profile set-pin",
        &ProfileEntry::from(&user),
        Some(&human),
    )
}

pub fn run_clear_pin(options: ProfileOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let user = app.clear_pin()?;

    let mut human = HumanOutput::new("PIN removed");
    human.push_summary("Username", user.username.clone());
    human.push_toasts(app.take_toasts());
    emit_success(
        options.output,
        "profile clear-pin",
        &ProfileEntry::from(&user),
        Some(&human),
    )
}

#[derive(Serialize)]
struct DeleteReport {
    deleted: String,
    logged_out: bool,
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut app = open_app(options.data_dir)?;
    let was_authenticated = app.user().is_ok();
    let deleted = app.delete_profile(options.username.as_deref())?;
    let logged_out = was_authenticated && app.user().is_err();

    let mut human = HumanOutput::new(format!("Deleted profile {deleted}"));
    if logged_out {
        human.push_summary("Session", "logged out");
        human.push_next_step("tasklify login <username>");
    }
    human.push_toasts(app.take_toasts());
    emit_success(
        options.output,
        "profile delete",
        &DeleteReport {
            deleted,
            logged_out,
        },
        Some(&human),
    )
}
