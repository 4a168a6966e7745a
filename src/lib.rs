//! tasklify - Task Manager Library
//!
//! Core functionality behind the tasklify CLI: profiles with optional PIN
//! locks, per-user task lists, and the derived views (filters, sorting,
//! stats, reminders, calendar) built on top of them.
//!
//! # Module Organization
//!
//! - `storage`: Key-value persistence (file-backed or in-memory)
//! - `db`: Typed access to tasks, sessions and profiles
//! - `task`: Task model, drafts and patches
//! - `profile`: User profiles and PIN validation
//! - `store`: Task store with automatic missed detection
//! - `auth`: Login, logout and profile management
//! - `view`: Filtering, search, sorting, grouping and stats
//! - `notify`: Toast notifications and search debouncing
//! - `app`: Wiring of the stores around one database
//! - `dates`: Local-calendar date handling
//! - `config`: Configuration loading from `tasklify.toml`
//! - `cli`: Command-line interface using clap
//! - `output`: Human and JSON output envelopes
//! - `lock`: File locking and atomic writes
//! - `error`: Error types and result aliases

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod lock;
pub mod notify;
pub mod output;
pub mod profile;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

pub use error::{Error, Result};
