//! Command-line interface for tasklify
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::App;
use crate::config::{self, Config, StorageBackend, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::OutputOptions;

mod calendar;
mod dashboard;
mod profile;
mod session;
mod task;

/// tasklify - a local task manager
///
/// Tasks are grouped by category, tracked as ongoing, finished or missed,
/// and stored per local profile on this machine.
#[derive(Parser, Debug)]
#[command(name = "tasklify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding tasklify.toml and the data store
    #[arg(long, global = true, env = "TASKLIFY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in as a local profile, creating it on first use
    Login {
        /// Profile username (case-insensitive)
        username: String,

        /// 4-digit PIN, required when the profile has one
        #[arg(long)]
        pin: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the active profile
    Whoami,

    /// Profile management
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Progress, recent results and upcoming deadlines
    Dashboard,

    /// Month view of deadlines
    Calendar {
        /// Month to show (YYYY-MM); defaults to the current month
        #[arg(long)]
        month: Option<String>,

        /// List the tasks due on one day (YYYY-MM-DD, today, tomorrow, +N)
        #[arg(long)]
        day: Option<String>,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List local profiles
    List,

    /// Update the active profile
    Update {
        /// New display name; an empty value clears it
        #[arg(long)]
        display_name: String,
    },

    /// Protect the active profile with a PIN
    SetPin {
        /// New 4-digit PIN
        pin: String,

        /// The same PIN again
        #[arg(long, required = true)]
        confirm: String,
    },

    /// Remove the PIN from the active profile
    ClearPin,

    /// Delete a profile and all of its tasks
    Delete {
        /// Profile to delete (defaults to the active one)
        username: Option<String>,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Category label (e.g. a course code)
        #[arg(short, long)]
        category: String,

        /// Deadline: YYYY-MM-DD, today, tomorrow or +N days (default: today)
        #[arg(short, long)]
        deadline: Option<String>,

        /// Free-form details
        #[arg(long)]
        details: Option<String>,

        /// Priority: low, medium, high, urgent
        #[arg(short, long, default_value = "medium")]
        priority: String,
    },

    /// List tasks
    List {
        /// Status filter: all, ongoing, finished, missed
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Case-insensitive search over title, details and category
        #[arg(short, long)]
        search: Option<String>,

        /// Sort key: deadline, created, alpha, priority
        #[arg(long)]
        sort: Option<String>,

        /// Sort direction: asc, desc
        #[arg(long)]
        order: Option<String>,

        /// Group by category
        #[arg(short, long)]
        group: bool,
    },

    /// Show one task
    Show {
        /// Task id or unique id prefix
        id: String,
    },

    /// Edit task fields
    Edit {
        /// Task id or unique id prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        details: Option<String>,

        #[arg(long)]
        deadline: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Set task status
    Status {
        /// Task id or unique id prefix
        id: String,

        /// ongoing, finished, missed
        status: String,
    },

    /// Delete a task
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// List categories in use
    Categories,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let data_dir = self.data_dir;

        match self.command {
            Commands::Login { username, pin } => session::run_login(session::LoginOptions {
                username,
                pin,
                data_dir,
                output,
            }),
            Commands::Logout => session::run_logout(session::SessionOptions { data_dir, output }),
            Commands::Whoami => session::run_whoami(session::SessionOptions { data_dir, output }),
            Commands::Profile(cmd) => match cmd {
                ProfileCommands::List => profile::run_list(profile::ProfileOptions { data_dir, output }),
                ProfileCommands::Update { display_name } => {
                    profile::run_update(profile::UpdateOptions {
                        display_name,
                        data_dir,
                        output,
                    })
                }
                ProfileCommands::SetPin { pin, confirm } => {
                    profile::run_set_pin(profile::SetPinOptions {
                        pin,
                        confirm,
                        data_dir,
                        output,
                    })
                }
                ProfileCommands::ClearPin => {
                    profile::run_clear_pin(profile::ProfileOptions { data_dir, output })
                }
                ProfileCommands::Delete { username } => {
                    profile::run_delete(profile::DeleteOptions {
                        username,
                        data_dir,
                        output,
                    })
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    category,
                    deadline,
                    details,
                    priority,
                } => task::run_add(task::AddOptions {
                    title,
                    category,
                    deadline,
                    details,
                    priority,
                    data_dir,
                    output,
                }),
                TaskCommands::List {
                    filter,
                    search,
                    sort,
                    order,
                    group,
                } => task::run_list(task::ListOptions {
                    filter,
                    search,
                    sort,
                    order,
                    group,
                    data_dir,
                    output,
                }),
                TaskCommands::Show { id } => task::run_show(task::IdOptions {
                    id,
                    data_dir,
                    output,
                }),
                TaskCommands::Edit {
                    id,
                    title,
                    details,
                    deadline,
                    category,
                    priority,
                    status,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    details,
                    deadline,
                    category,
                    priority,
                    status,
                    data_dir,
                    output,
                }),
                TaskCommands::Status { id, status } => task::run_status(task::StatusOptions {
                    id,
                    status,
                    data_dir,
                    output,
                }),
                TaskCommands::Rm { id } => task::run_rm(task::IdOptions {
                    id,
                    data_dir,
                    output,
                }),
                TaskCommands::Categories => {
                    task::run_categories(task::CategoriesOptions { data_dir, output })
                }
            },
            Commands::Dashboard => dashboard::run(dashboard::DashboardOptions { data_dir, output }),
            Commands::Calendar { month, day } => calendar::run(calendar::CalendarOptions {
                month,
                day,
                data_dir,
                output,
            }),
        }
    }
}

/// Resolve the data directory, load its config and open the app.
///
/// A config file that exists but does not parse is an error here; the
/// library-level loader would silently fall back to defaults.
pub(crate) fn open_app(data_dir: Option<PathBuf>) -> Result<App> {
    let data_dir = config::resolve_data_dir(data_dir.as_deref());
    std::fs::create_dir_all(&data_dir)?;

    let config_path = data_dir.join(CONFIG_FILE);
    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };
    // The CLI needs a store that outlives the process.
    if config.storage.backend == StorageBackend::Memory {
        return Err(Error::InvalidConfig(
            "storage.backend = \"memory\" does not persist between commands; use \"file\""
                .to_string(),
        ));
    }
    tracing::debug!(data_dir = %data_dir.display(), "opening tasklify");
    Ok(App::open(config, &data_dir))
}
