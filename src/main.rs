//! Binary entry point: resolve configuration, start logging, open the
//! database, then either run a one-shot subcommand or the TUI.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use student_roster::logging::init_logging;
use student_roster::{open_database, run_app, App, Cli, Command, Config, RecordService};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(&cli)?;
    init_logging(&config)?;
    info!(db = %config.db_path.display(), "starting student roster");

    let conn = open_database(&config.db_path)?;
    let service = RecordService::new(conn);
    info!(students = service.count()?, "roster loaded");

    match cli.command {
        None => {
            let mut app = App::new(service, config.default_export_path())
                .context("failed to load students")?;
            run_app(&mut app)
        }
        Some(Command::List) => print_roster(&service),
        Some(Command::Export { path }) => {
            export_roster(&service, path.unwrap_or_else(|| config.default_export_path()))
        }
    }
}

fn print_roster(service: &RecordService) -> Result<()> {
    for student in service.list_all()? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            student.id, student.first_name, student.last_name, student.email, student.mark
        );
    }
    Ok(())
}

fn export_roster(service: &RecordService, path: PathBuf) -> Result<()> {
    let summary = service.export(path)?.wait()?;
    println!(
        "Exported {} students to {}",
        summary.rows,
        summary.path.display()
    );
    Ok(())
}
