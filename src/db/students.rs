use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};

use crate::error::{storage, RosterError, RosterResult};
use crate::models::StudentRecord;

const SELECT_COLUMNS: &str = "SELECT id, firstName, lastName, email, mark FROM students";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        mark: row.get(4)?,
    })
}

/// Retrieve every student in storage order. Updates keep their rowid, so a
/// record whose ID changed stays where it was.
pub fn fetch_students(conn: &Connection) -> RosterResult<Vec<StudentRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
        .map_err(storage("preparing the student query"))?;

    let students = stmt
        .query_map([], student_from_row)
        .map_err(storage("loading students"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage("reading students"))?;

    Ok(students)
}

/// Look a student up by primary key.
pub fn find_student(conn: &Connection, id: &str) -> RosterResult<Option<StudentRecord>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id],
        student_from_row,
    )
    .optional()
    .map_err(storage("looking up a student"))
}

pub fn count_students(conn: &Connection) -> RosterResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
        .map_err(storage("counting students"))
}

/// Insert a new row. A clash on the primary key comes back as
/// `DuplicateKey` even when no lookup ran beforehand.
pub fn insert_student(conn: &Connection, student: &StudentRecord) -> RosterResult<()> {
    conn.execute(
        "INSERT INTO students (id, firstName, lastName, email, mark)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            student.id,
            student.first_name,
            student.last_name,
            student.email,
            student.mark
        ],
    )
    .map_err(|err| map_unique_constraint(err, &student.id, "saving the student"))?;
    Ok(())
}

/// Replace the row stored under `original_id` with `student`. The ID itself
/// may change here, which is how the edit workflow re-keys a record.
pub fn update_student(
    conn: &Connection,
    original_id: &str,
    student: &StudentRecord,
) -> RosterResult<()> {
    let updated = conn
        .execute(
            "UPDATE students
             SET id = ?1, firstName = ?2, lastName = ?3, email = ?4, mark = ?5
             WHERE id = ?6",
            params![
                student.id,
                student.first_name,
                student.last_name,
                student.email,
                student.mark,
                original_id
            ],
        )
        .map_err(|err| map_unique_constraint(err, &student.id, "updating the student"))?;

    if updated == 0 {
        Err(RosterError::NotFound {
            id: original_id.to_string(),
        })
    } else {
        Ok(())
    }
}

pub fn delete_student(conn: &Connection, id: &str) -> RosterResult<()> {
    let deleted = conn
        .execute("DELETE FROM students WHERE id = ?1", params![id])
        .map_err(storage("deleting the student"))?;

    if deleted == 0 {
        Err(RosterError::NotFound { id: id.to_string() })
    } else {
        Ok(())
    }
}

/// The only constraint on the table is the primary key, so any constraint
/// violation on a write means the ID is taken.
fn map_unique_constraint(err: SqlError, id: &str, action: &'static str) -> RosterError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        RosterError::DuplicateKey { id: id.to_string() }
    } else {
        storage(action)(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn
    }

    fn student(id: &str, first: &str) -> StudentRecord {
        StudentRecord {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: "Lee".to_string(),
            email: format!("{}@x.com", first.to_lowercase()),
            mark: "90".to_string(),
        }
    }

    #[test]
    fn insert_then_fetch_preserves_order() {
        let conn = conn();
        insert_student(&conn, &student("20", "Bob")).unwrap();
        insert_student(&conn, &student("3", "Ann")).unwrap();

        let ids: Vec<_> = fetch_students(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["20", "3"]);
        assert_eq!(count_students(&conn).unwrap(), 2);
    }

    #[test]
    fn duplicate_insert_maps_to_duplicate_key() {
        let conn = conn();
        insert_student(&conn, &student("1", "Ann")).unwrap();
        let err = insert_student(&conn, &student("1", "Bob")).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateKey { ref id } if id == "1"));
        assert_eq!(find_student(&conn, "1").unwrap().unwrap().first_name, "Ann");
    }

    #[test]
    fn update_can_rekey_and_keeps_position() {
        let conn = conn();
        insert_student(&conn, &student("1", "Ann")).unwrap();
        insert_student(&conn, &student("2", "Bob")).unwrap();

        update_student(&conn, "1", &student("9", "Ann")).unwrap();

        assert!(find_student(&conn, "1").unwrap().is_none());
        let ids: Vec<_> = fetch_students(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["9", "2"]);
    }

    #[test]
    fn update_onto_existing_key_is_rejected() {
        let conn = conn();
        insert_student(&conn, &student("1", "Ann")).unwrap();
        insert_student(&conn, &student("2", "Bob")).unwrap();

        let err = update_student(&conn, "1", &student("2", "Ann")).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateKey { .. }));
        assert_eq!(find_student(&conn, "2").unwrap().unwrap().first_name, "Bob");
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let conn = conn();
        assert!(matches!(
            update_student(&conn, "5", &student("5", "Ann")),
            Err(RosterError::NotFound { .. })
        ));
        assert!(matches!(
            delete_student(&conn, "5"),
            Err(RosterError::NotFound { .. })
        ));
    }

    #[test]
    fn quotes_are_stored_literally() {
        let conn = conn();
        let mut tricky = student("1", "Ann");
        tricky.last_name = "O'Brien'); DROP TABLE students; --".to_string();
        insert_student(&conn, &tricky).unwrap();

        let stored = find_student(&conn, "1").unwrap().unwrap();
        assert_eq!(stored.last_name, tricky.last_name);
        assert_eq!(count_students(&conn).unwrap(), 1);
    }
}
