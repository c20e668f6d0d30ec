use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Draft, StudentField, StudentRecord};

/// Focus and error state for the add/edit popup. The field values themselves
/// live in the session draft so the service sees exactly what was typed.
#[derive(Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

impl StudentForm {
    pub(crate) fn next_field(&mut self) {
        self.active = self.active.next();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = self.active.previous();
    }

    /// Append a character to the focused field. Control characters are
    /// ignored; everything else is left for validation to judge.
    pub(crate) fn push_char(&mut self, draft: &mut Draft, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        draft.field_mut(self.active).push(ch);
        true
    }

    pub(crate) fn backspace(&mut self, draft: &mut Draft) {
        draft.field_mut(self.active).pop();
    }

    /// Label prefix drawn before a field's value, e.g. `First Name: `.
    pub(crate) fn prefix(field: StudentField) -> String {
        format!("{}: ", field.label())
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, draft: &Draft, field: StudentField) -> Line<'static> {
        let value = draft.field(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(Self::prefix(field)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset within the popup for the focused field.
    pub(crate) fn cursor_offset(&self, draft: &Draft) -> usize {
        Self::prefix(self.active).chars().count() + draft.field(self.active).chars().count()
    }

    /// Row of the focused field within the popup.
    pub(crate) fn cursor_row(&self) -> usize {
        StudentField::ALL
            .iter()
            .position(|field| *field == self.active)
            .unwrap_or_default()
    }
}

/// Pending delete awaiting a Y/N answer.
#[derive(Clone)]
pub(crate) struct ConfirmStudentDelete {
    pub(crate) index: usize,
    pub(crate) student: StudentRecord,
}
