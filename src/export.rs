//! Spreadsheet export. The workbook is built on a worker thread so the TUI
//! keeps drawing while a large roster is written; the caller gets an
//! `ExportHandle` to poll, wait on, or cancel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rust_xlsxwriter::{Format, Workbook};
use tracing::{error, info, warn};

use crate::error::{io_error, RosterError, RosterResult};
use crate::models::{StudentField, StudentRecord};

/// Name of the single worksheet in every export.
pub const SHEET_NAME: &str = "Students";
/// Width, in characters, applied to each of the five columns.
pub const COLUMN_WIDTH: u16 = 15;
/// File name used when the caller only picks a directory.
pub const DEFAULT_FILE_NAME: &str = "students.xlsx";

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Data rows written, header excluded.
    pub rows: usize,
}

/// Write `records` to an `.xlsx` file at `path`, checking `cancel` between
/// rows. Nothing is written to disk if cancellation is observed.
pub fn write_workbook(
    records: &[StudentRecord],
    path: &Path,
    cancel: &AtomicBool,
) -> RosterResult<ExportSummary> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, field) in (0u16..).zip(StudentField::ALL) {
        sheet.write_string_with_format(0, col, field.label(), &bold)?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    for (row, record) in (1u32..).zip(records) {
        if cancel.load(Ordering::Acquire) {
            return Err(RosterError::Cancelled);
        }
        sheet.write_string(row, 0, &record.id)?;
        sheet.write_string(row, 1, &record.first_name)?;
        sheet.write_string(row, 2, &record.last_name)?;
        sheet.write_string(row, 3, &record.email)?;
        sheet.write_string(row, 4, &record.mark)?;
    }

    if cancel.load(Ordering::Acquire) {
        return Err(RosterError::Cancelled);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error("creating the export directory"))?;
        }
    }
    workbook.save(path)?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: records.len(),
    })
}

/// Start writing `records` to `destination` on a dedicated thread.
pub fn spawn_export(
    records: Vec<StudentRecord>,
    destination: PathBuf,
) -> RosterResult<ExportHandle> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (sender, receiver) = mpsc::channel();

    let worker_cancel = Arc::clone(&cancel);
    let worker_path = destination.clone();
    let worker = thread::Builder::new()
        .name("student-export".to_string())
        .spawn(move || {
            let outcome = write_workbook(&records, &worker_path, &worker_cancel);
            match &outcome {
                Ok(summary) => {
                    info!(rows = summary.rows, path = %summary.path.display(), "export finished")
                }
                Err(RosterError::Cancelled) => {
                    warn!(path = %worker_path.display(), "export cancelled")
                }
                Err(err) => error!(error = ?err, path = %worker_path.display(), "export failed"),
            }
            // The receiver may already be gone if the caller dropped the handle.
            let _ = sender.send(outcome);
        })
        .map_err(io_error("starting the export worker"))?;

    Ok(ExportHandle {
        destination,
        cancel,
        receiver,
        worker: Some(worker),
    })
}

/// Completion signal for a running export. The result is delivered exactly
/// once, through either `try_result` or `wait`.
#[derive(Debug)]
pub struct ExportHandle {
    destination: PathBuf,
    cancel: Arc<AtomicBool>,
    receiver: Receiver<RosterResult<ExportSummary>>,
    worker: Option<JoinHandle<()>>,
}

impl ExportHandle {
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Ask the worker to stop. Takes effect at the next row boundary; an
    /// export that already saved its file still reports success.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Non-blocking check for the outcome.
    pub fn try_result(&mut self) -> Option<RosterResult<ExportSummary>> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.join_worker();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join_worker();
                Some(Err(RosterError::WorkerLost))
            }
        }
    }

    /// Block until the worker reports.
    pub fn wait(mut self) -> RosterResult<ExportSummary> {
        let outcome = self
            .receiver
            .recv()
            .unwrap_or(Err(RosterError::WorkerLost));
        self.join_worker();
        outcome
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("export worker panicked");
            }
        }
    }
}
