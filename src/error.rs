//! Error taxonomy shared by the store, the service and the exporter. Display
//! strings are the short messages the front-end shows; underlying causes stay
//! reachable through `source()` for the log.

use std::io;

use rusqlite::Error as SqlError;
use thiserror::Error;

use crate::models::StudentField;

pub type RosterResult<T> = Result<T, RosterError>;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("{field}: {reason}")]
    Format {
        field: StudentField,
        reason: &'static str,
    },
    #[error("Another student exists with the ID {id}.")]
    DuplicateKey { id: String },
    #[error("No student with the ID {id} was found.")]
    NotFound { id: String },
    #[error("Select a record first.")]
    NoSelection,
    #[error("Database is empty. Insert some records first.")]
    EmptyStore,
    #[error("An error occurred while {action}. Please try again.")]
    Storage {
        action: &'static str,
        #[source]
        source: SqlError,
    },
    #[error("Could not write the spreadsheet.")]
    Export {
        #[from]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("An error occurred while {action}.")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Export cancelled.")]
    Cancelled,
    #[error("The export worker stopped without reporting a result.")]
    WorkerLost,
}

impl RosterError {
    pub(crate) fn format(field: StudentField, reason: &'static str) -> Self {
        RosterError::Format { field, reason }
    }

    /// True for failures the user can fix by changing their input or
    /// selection, as opposed to storage or export faults.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RosterError::Format { .. }
                | RosterError::DuplicateKey { .. }
                | RosterError::NoSelection
                | RosterError::EmptyStore
        )
    }
}

/// Build a `map_err` adapter that tags a SQLite failure with what we were
/// doing when it happened.
pub(crate) fn storage(action: &'static str) -> impl FnOnce(SqlError) -> RosterError {
    move |source| RosterError::Storage { action, source }
}

pub(crate) fn io_error(action: &'static str) -> impl FnOnce(io::Error) -> RosterError {
    move |source| RosterError::Io { action, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_short_and_free_of_internals() {
        let err = storage("loading students")(SqlError::InvalidQuery);
        assert_eq!(
            err.to_string(),
            "An error occurred while loading students. Please try again."
        );
        assert!(!err.is_user_error());

        let err = RosterError::format(StudentField::Mark, "must be a whole number");
        assert_eq!(err.to_string(), "Mark: must be a whole number");
        assert!(err.is_user_error());
    }
}
