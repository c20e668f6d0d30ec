//! Domain models that mirror the `students` table and get passed between the
//! service, the exporter and the TUI. They stay plain data holders; the rules
//! about what a valid record looks like live in `validation`.

use std::fmt;

/// A committed student row. Every value that reaches this type has passed
/// validation, but the fields stay textual because the schema stores them as
/// text and the exporter writes them back out verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    /// Primary key. Digits only, fits a `u64`.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Digits only, fits a `u64`.
    pub mark: String,
}

impl StudentRecord {
    /// `First Last`, used in status messages and the delete confirmation.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for StudentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.id)
    }
}

/// Free-text working copy of a record while it is being composed or edited.
/// Nothing here is trusted until `validation::validate` turns it into a
/// `StudentRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mark: String,
}

impl Draft {
    /// Reset every field to empty so the next form starts clean.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Read a single field by name.
    pub fn field(&self, field: StudentField) -> &str {
        match field {
            StudentField::Id => &self.id,
            StudentField::FirstName => &self.first_name,
            StudentField::LastName => &self.last_name,
            StudentField::Email => &self.email,
            StudentField::Mark => &self.mark,
        }
    }

    /// Mutable access to a single field, used by form key handling.
    pub fn field_mut(&mut self, field: StudentField) -> &mut String {
        match field {
            StudentField::Id => &mut self.id,
            StudentField::FirstName => &mut self.first_name,
            StudentField::LastName => &mut self.last_name,
            StudentField::Email => &mut self.email,
            StudentField::Mark => &mut self.mark,
        }
    }

    pub fn is_empty(&self) -> bool {
        StudentField::ALL
            .iter()
            .all(|field| self.field(*field).is_empty())
    }
}

impl From<&StudentRecord> for Draft {
    fn from(record: &StudentRecord) -> Self {
        Self {
            id: record.id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            mark: record.mark.clone(),
        }
    }
}

/// The five columns of a student, in table order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StudentField {
    #[default]
    Id,
    FirstName,
    LastName,
    Email,
    Mark,
}

impl StudentField {
    pub const ALL: [StudentField; 5] = [
        StudentField::Id,
        StudentField::FirstName,
        StudentField::LastName,
        StudentField::Email,
        StudentField::Mark,
    ];

    /// Column heading shared by the TUI table and the spreadsheet export.
    pub fn label(self) -> &'static str {
        match self {
            StudentField::Id => "ID",
            StudentField::FirstName => "First Name",
            StudentField::LastName => "Last Name",
            StudentField::Email => "Email",
            StudentField::Mark => "Mark",
        }
    }

    pub fn next(self) -> Self {
        match self {
            StudentField::Id => StudentField::FirstName,
            StudentField::FirstName => StudentField::LastName,
            StudentField::LastName => StudentField::Email,
            StudentField::Email => StudentField::Mark,
            StudentField::Mark => StudentField::Id,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            StudentField::Id => StudentField::Mark,
            StudentField::FirstName => StudentField::Id,
            StudentField::LastName => StudentField::FirstName,
            StudentField::Email => StudentField::LastName,
            StudentField::Mark => StudentField::Email,
        }
    }
}

impl fmt::Display for StudentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
