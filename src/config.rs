//! Command-line and environment configuration. Every path has a sensible
//! per-user default so running the binary with no arguments just works.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use directories::{BaseDirs, ProjectDirs, UserDirs};

/// Folder name used beneath the user's home when no platform data directory
/// can be determined.
const FALLBACK_DIR_NAME: &str = ".student-roster";
const DB_FILE_NAME: &str = "students.sqlite";
const LOG_FILE_NAME: &str = "student-roster.log";

#[derive(Debug, Parser)]
#[command(name = "student-roster", version, about = "Manage a roster of student records")]
pub struct Cli {
    /// Directory holding the database and log file.
    #[arg(long, env = "STUDENT_ROSTER_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// SQLite file to use instead of `<data dir>/students.sqlite`.
    #[arg(long, env = "STUDENT_ROSTER_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Where exports go when no explicit path is given.
    #[arg(long, env = "STUDENT_ROSTER_EXPORT_DIR", global = true)]
    pub export_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "STUDENT_ROSTER_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print every student as tab-separated values.
    List,
    /// Write all students to an .xlsx spreadsheet and wait for it to finish.
    Export {
        /// Output file; defaults to `<export dir>/students.xlsx`.
        path: Option<PathBuf>,
    },
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub log_path: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let db_path = cli
            .db
            .clone()
            .unwrap_or_else(|| data_dir.join(DB_FILE_NAME));
        let export_dir = cli
            .export_dir
            .clone()
            .or_else(default_export_dir)
            .unwrap_or_else(|| data_dir.clone());

        Ok(Self {
            log_path: data_dir.join(LOG_FILE_NAME),
            data_dir,
            db_path,
            export_dir,
            log_level: cli.log_level.clone(),
        })
    }

    /// Default destination for an export started without an explicit path.
    pub fn default_export_path(&self) -> PathBuf {
        self.export_dir.join(crate::export::DEFAULT_FILE_NAME)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dirs) = ProjectDirs::from("", "", "student-roster") {
        return Ok(dirs.data_dir().to_path_buf());
    }
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(FALLBACK_DIR_NAME))
}

fn default_export_dir() -> Option<PathBuf> {
    UserDirs::new().and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
}
