//! Persistence for the `students` table, split into connection setup and the
//! per-row queries.

mod connection;
mod students;

pub use connection::{ensure_schema, open_database};
pub use students::{
    count_students, delete_student, fetch_students, find_student, insert_student, update_student,
};
