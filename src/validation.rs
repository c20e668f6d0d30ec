//! Field rules for student drafts. Everything here is pure so the service can
//! run it before touching the database.

use std::str::FromStr;

use email_address::EmailAddress;

use crate::error::{RosterError, RosterResult};
use crate::models::{Draft, StudentField, StudentRecord};

/// Check every field of `draft` in column order and return the record it
/// describes. The first failing field wins.
pub fn validate(draft: &Draft) -> RosterResult<StudentRecord> {
    check_number(StudentField::Id, &draft.id)?;
    check_name(StudentField::FirstName, &draft.first_name)?;
    check_name(StudentField::LastName, &draft.last_name)?;
    check_email(&draft.email)?;
    check_number(StudentField::Mark, &draft.mark)?;

    Ok(StudentRecord {
        id: draft.id.clone(),
        first_name: draft.first_name.clone(),
        last_name: draft.last_name.clone(),
        email: draft.email.clone(),
        mark: draft.mark.clone(),
    })
}

/// Digits only, and small enough for a `u64`. `str::parse` alone would let a
/// leading `+` through, so the character check comes first.
pub fn check_number(field: StudentField, value: &str) -> RosterResult<u64> {
    if value.is_empty() {
        return Err(RosterError::format(field, "is required."));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RosterError::format(field, "must be a whole number."));
    }
    value
        .parse::<u64>()
        .map_err(|_| RosterError::format(field, "is too large."))
}

pub fn check_name(field: StudentField, value: &str) -> RosterResult<()> {
    if value.is_empty() {
        return Err(RosterError::format(field, "is required."));
    }
    if !value.chars().all(is_name_char) {
        return Err(RosterError::format(
            field,
            "may only contain letters, spaces, apostrophes and hyphens.",
        ));
    }
    Ok(())
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, ' ' | '\'' | '-')
}

/// Accept a bare `local@domain` address only. Parsing must succeed and the
/// canonical address must round-trip to exactly the input, which rules out
/// display names and stray whitespace.
pub fn check_email(value: &str) -> RosterResult<()> {
    if value.is_empty() {
        return Err(RosterError::format(StudentField::Email, "is required."));
    }
    let invalid = || RosterError::format(StudentField::Email, "is not a valid email address.");
    if value.trim() != value {
        return Err(invalid());
    }
    let address = EmailAddress::from_str(value).map_err(|_| invalid())?;
    if address.email() != value {
        return Err(invalid());
    }
    Ok(())
}
