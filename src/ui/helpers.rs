use ratatui::layout::{Constraint, Direction, Layout, Rect};
use tracing::error;

use crate::error::RosterError;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Turn an error into the one-line message shown in the footer. Faults the
/// user cannot fix get their full cause chain written to the log first.
pub(crate) fn surface_error(err: &RosterError) -> String {
    if !err.is_user_error() {
        error!(error = ?err, "operation failed");
    }
    err.to_string()
}
