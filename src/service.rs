//! Record management on top of the `students` table. Every write goes
//! validate → uniqueness check → persist, and the check and the write share
//! one immediate transaction so a concurrent writer cannot slip in between.
//!
//! The in-progress draft and the "which record am I editing" marker live in a
//! caller-owned [`Session`] rather than in the service, so each front-end
//! instance (or test) carries its own.

use std::path::PathBuf;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::db::{
    count_students, delete_student, fetch_students, find_student, insert_student, update_student,
};
use crate::error::{storage, RosterError, RosterResult};
use crate::export::{spawn_export, ExportHandle};
use crate::models::{Draft, StudentRecord};
use crate::validation::validate;

/// Marks an edit in progress: the ID the record had when editing began, used
/// to find the row again even if the draft changes its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    original_id: String,
}

impl EditSession {
    pub fn original_id(&self) -> &str {
        &self.original_id
    }
}

/// Caller-side state for composing records: one draft shared by the create
/// and edit forms, plus the active edit, if any.
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub draft: Draft,
    edit: Option<EditSession>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// Drop any active edit along with the draft it was using.
    pub fn abandon_edit(&mut self) {
        self.edit = None;
        self.draft.clear();
    }
}

/// Orchestrates validation and persistence for student records.
pub struct RecordService {
    conn: Connection,
}

impl RecordService {
    /// Wrap a connection whose schema has already been created.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn list_all(&self) -> RosterResult<Vec<StudentRecord>> {
        fetch_students(&self.conn)
    }

    pub fn find(&self, id: &str) -> RosterResult<Option<StudentRecord>> {
        find_student(&self.conn, id)
    }

    pub fn count(&self) -> RosterResult<i64> {
        count_students(&self.conn)
    }

    /// Persist `session.draft` as a new student and clear the draft.
    pub fn create(&self, session: &mut Session) -> RosterResult<StudentRecord> {
        let record = validate(&session.draft).inspect_err(|err| {
            debug!(error = %err, "create rejected by validation");
        })?;

        let tx = self.immediate_transaction()?;
        if find_student(&tx, &record.id)?.is_some() {
            warn!(id = %record.id, "create rejected: id already in use");
            return Err(RosterError::DuplicateKey { id: record.id });
        }
        insert_student(&tx, &record)?;
        tx.commit().map_err(storage("saving the student"))?;

        info!(id = %record.id, "student created");
        session.draft.clear();
        Ok(record)
    }

    /// Load `selected` into the draft and remember its ID. Any edit left
    /// behind by an earlier, abandoned attempt is replaced.
    pub fn begin_edit(
        &self,
        session: &mut Session,
        selected: Option<&StudentRecord>,
    ) -> RosterResult<()> {
        let selected = selected.ok_or(RosterError::NoSelection)?;
        if let Some(stale) = session.edit.as_ref() {
            debug!(stale = %stale.original_id, "replacing unfinished edit");
        }

        session.draft = Draft::from(selected);
        session.edit = Some(EditSession {
            original_id: selected.id.clone(),
        });
        debug!(id = %selected.id, "edit started");
        Ok(())
    }

    /// Write the draft over the record the edit started from. On failure the
    /// session is left as it was so the user can fix the draft and retry.
    pub fn commit_edit(&self, session: &mut Session) -> RosterResult<StudentRecord> {
        let original_id = session
            .edit
            .as_ref()
            .map(|edit| edit.original_id.clone())
            .ok_or(RosterError::NoSelection)?;

        let record = validate(&session.draft).inspect_err(|err| {
            debug!(error = %err, "edit rejected by validation");
        })?;

        let tx = self.immediate_transaction()?;
        if let Some(existing) = find_student(&tx, &record.id)? {
            if existing.id != original_id {
                warn!(
                    id = %record.id,
                    original = %original_id,
                    "edit rejected: id belongs to another student"
                );
                return Err(RosterError::DuplicateKey { id: record.id });
            }
        }
        update_student(&tx, &original_id, &record)?;
        tx.commit().map_err(storage("updating the student"))?;

        info!(id = %record.id, original = %original_id, "student updated");
        session.edit = None;
        session.draft.clear();
        Ok(record)
    }

    pub fn abandon_edit(&self, session: &mut Session) {
        if let Some(edit) = session.editing() {
            debug!(id = %edit.original_id, "edit abandoned");
        }
        session.abandon_edit();
    }

    /// Remove the selected student by ID.
    pub fn delete(&self, selected: Option<&StudentRecord>) -> RosterResult<()> {
        let selected = selected.ok_or(RosterError::NoSelection)?;
        delete_student(&self.conn, &selected.id)?;
        info!(id = %selected.id, "student deleted");
        Ok(())
    }

    /// Delete the student shown at `index` of the caller's listing and drop
    /// it from that listing once the row is gone.
    pub fn delete_from_listing(
        &self,
        listing: &mut Vec<StudentRecord>,
        index: Option<usize>,
    ) -> RosterResult<StudentRecord> {
        let index = index
            .filter(|idx| *idx < listing.len())
            .ok_or(RosterError::NoSelection)?;
        self.delete(listing.get(index))?;
        Ok(listing.remove(index))
    }

    /// Start exporting every student to `destination`. Fails fast, before any
    /// worker or file exists, when there is nothing to export.
    pub fn export(&self, destination: PathBuf) -> RosterResult<ExportHandle> {
        let records = self.list_all()?;
        if records.is_empty() {
            warn!("export requested on an empty roster");
            return Err(RosterError::EmptyStore);
        }
        info!(rows = records.len(), path = %destination.display(), "export started");
        spawn_export(records, destination)
    }

    fn immediate_transaction(&self) -> RosterResult<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(storage("starting a transaction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use crate::models::StudentField;

    fn service() -> RecordService {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        RecordService::new(conn)
    }

    fn draft(id: &str, first: &str, mark: &str) -> Draft {
        Draft {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: "Lee".to_string(),
            email: format!("{}@x.com", first.to_lowercase()),
            mark: mark.to_string(),
        }
    }

    fn seed(service: &RecordService, drafts: &[Draft]) -> Vec<StudentRecord> {
        let mut session = Session::new();
        drafts
            .iter()
            .map(|d| {
                session.draft = d.clone();
                service.create(&mut session).unwrap()
            })
            .collect()
    }

    #[test]
    fn create_persists_and_clears_draft() {
        let service = service();
        let mut session = Session::new();
        session.draft = draft("1", "Ann", "90");

        let record = service.create(&mut session).unwrap();

        assert!(session.draft.is_empty());
        assert_eq!(service.list_all().unwrap(), vec![record]);
    }

    #[test]
    fn create_with_duplicate_id_changes_nothing() {
        let service = service();
        seed(&service, &[draft("1", "Ann", "90")]);

        let mut session = Session::new();
        session.draft = draft("1", "Bob", "10");
        let err = service.create(&mut session).unwrap_err();

        assert!(matches!(err, RosterError::DuplicateKey { ref id } if id == "1"));
        assert_eq!(session.draft.first_name, "Bob", "draft kept for correction");
        let all = service.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].first_name, "Ann");
    }

    #[test]
    fn invalid_draft_never_reaches_storage() {
        let service = service();
        let mut session = Session::new();
        session.draft = draft("1", "Ann", "ninety");

        let err = service.create(&mut session).unwrap_err();
        assert!(matches!(
            err,
            RosterError::Format {
                field: StudentField::Mark,
                ..
            }
        ));
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn begin_edit_requires_selection() {
        let service = service();
        let mut session = Session::new();
        assert!(matches!(
            service.begin_edit(&mut session, None),
            Err(RosterError::NoSelection)
        ));
        assert!(!session.is_editing());
    }

    #[test]
    fn commit_without_edit_is_rejected() {
        let service = service();
        let mut session = Session::new();
        session.draft = draft("1", "Ann", "90");
        assert!(matches!(
            service.commit_edit(&mut session),
            Err(RosterError::NoSelection)
        ));
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn edit_mark_updates_in_place() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90"), draft("2", "Bob", "50")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        assert_eq!(session.editing().unwrap().original_id(), "1");
        session.draft.mark = "95".to_string();
        service.commit_edit(&mut session).unwrap();

        assert!(!session.is_editing());
        assert!(session.draft.is_empty());
        let all = service.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].mark, "95");
        assert_eq!(all[1], records[1]);
    }

    #[test]
    fn edit_onto_another_students_id_is_rejected() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90"), draft("2", "Bob", "50")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        session.draft.id = "2".to_string();
        let err = service.commit_edit(&mut session).unwrap_err();

        assert!(matches!(err, RosterError::DuplicateKey { .. }));
        assert!(session.is_editing(), "failed commit keeps the edit open");
        assert_eq!(service.list_all().unwrap(), records);
    }

    #[test]
    fn edit_to_fresh_id_rekeys_record() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        session.draft.id = "42".to_string();
        service.commit_edit(&mut session).unwrap();

        assert!(service.find("1").unwrap().is_none());
        assert_eq!(service.find("42").unwrap().unwrap().first_name, "Ann");
        assert_eq!(service.count().unwrap(), 1);
    }

    #[test]
    fn names_with_apostrophes_persist_literally() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        session.draft.last_name = "O'Brien".to_string();
        service.commit_edit(&mut session).unwrap();

        assert_eq!(service.find("1").unwrap().unwrap().last_name, "O'Brien");
    }

    #[test]
    fn begin_edit_replaces_stale_session() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90"), draft("2", "Bob", "50")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        session.draft.mark = "1".to_string();
        // user wandered off, then edits a different record
        service.begin_edit(&mut session, Some(&records[1])).unwrap();

        assert_eq!(session.editing().unwrap().original_id(), "2");
        assert_eq!(session.draft, Draft::from(&records[1]));
    }

    #[test]
    fn abandon_edit_clears_session() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90")]);

        let mut session = Session::new();
        service.begin_edit(&mut session, Some(&records[0])).unwrap();
        service.abandon_edit(&mut session);

        assert!(!session.is_editing());
        assert!(session.draft.is_empty());
    }

    #[test]
    fn delete_removes_exactly_one_record() {
        let service = service();
        let records = seed(&service, &[draft("1", "Ann", "90"), draft("2", "Bob", "50")]);

        service.delete(Some(&records[0])).unwrap();

        assert_eq!(service.list_all().unwrap(), vec![records[1].clone()]);
        assert!(matches!(
            service.delete(Some(&records[0])),
            Err(RosterError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_without_selection_changes_nothing() {
        let service = service();
        seed(&service, &[draft("1", "Ann", "90")]);

        assert!(matches!(service.delete(None), Err(RosterError::NoSelection)));
        let mut listing = service.list_all().unwrap();
        assert!(matches!(
            service.delete_from_listing(&mut listing, Some(5)),
            Err(RosterError::NoSelection)
        ));
        assert_eq!(listing.len(), 1);
        assert_eq!(service.count().unwrap(), 1);
    }

    #[test]
    fn delete_from_listing_updates_callers_view() {
        let service = service();
        seed(
            &service,
            &[
                draft("1", "Ann", "90"),
                draft("2", "Bob", "50"),
                draft("3", "Cat", "70"),
            ],
        );
        let mut listing = service.list_all().unwrap();

        let removed = service.delete_from_listing(&mut listing, Some(1)).unwrap();

        assert_eq!(removed.id, "2");
        assert_eq!(listing, service.list_all().unwrap());
    }

    #[test]
    fn export_on_empty_store_fails_before_writing() {
        let service = service();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.xlsx");

        assert!(matches!(
            service.export(path.clone()),
            Err(RosterError::EmptyStore)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn export_writes_all_records() {
        let service = service();
        seed(&service, &[draft("1", "Ann", "90"), draft("2", "Bob", "50")]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.xlsx");

        let summary = service.export(path.clone()).unwrap().wait().unwrap();

        assert_eq!(summary.rows, 2);
        assert!(path.exists());
    }
}
