//! Core library for the Student Roster application.
//!
//! The record rules (validation, uniqueness, the edit workflow and export)
//! live in `service` and the modules below it; `ui` is one caller of that
//! API and the command-line subcommands in `main.rs` are another.
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod service;
pub mod ui;
pub mod validation;

pub use config::{Cli, Command, Config};
pub use db::open_database;
pub use error::{RosterError, RosterResult};
pub use export::{ExportHandle, ExportSummary};
pub use models::{Draft, StudentField, StudentRecord};
pub use service::{EditSession, RecordService, Session};
pub use ui::{run_app, App};
