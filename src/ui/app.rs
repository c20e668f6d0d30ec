use std::mem;
use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_path;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::error::RosterError;
use crate::export::ExportHandle;
use crate::models::{StudentField, StudentRecord};
use crate::service::{RecordService, Session};

use super::forms::{ConfirmStudentDelete, StudentForm};
use super::helpers::{centered_rect, surface_error};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// Fine-grained modes layered over the roster table.
enum Mode {
    Normal,
    Adding(StudentForm),
    Editing(StudentForm),
    ConfirmDelete(ConfirmStudentDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    service: RecordService,
    students: Vec<StudentRecord>,
    selected: usize,
    session: Session,
    mode: Mode,
    status: Option<StatusMessage>,
    export_path: PathBuf,
    export: Option<ExportHandle>,
    last_export: Option<PathBuf>,
}

impl App {
    /// Build the app and load the current roster.
    pub fn new(service: RecordService, export_path: PathBuf) -> Result<Self> {
        let students = service.list_all()?;
        Ok(Self {
            service,
            students,
            selected: 0,
            session: Session::new(),
            mode: Mode::Normal,
            status: None,
            export_path,
            export: None,
            last_export: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Adding(form) => self.handle_add(code, form),
            Mode::Editing(form) => self.handle_edit(code, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Pick up the result of a background export once it lands.
    pub(crate) fn tick(&mut self) {
        let Some(handle) = self.export.as_mut() else {
            return;
        };
        let Some(outcome) = handle.try_result() else {
            return;
        };
        self.export = None;

        match outcome {
            Ok(summary) => {
                self.set_status(
                    format!(
                        "Exported {} students to {}. Press 'o' to open it.",
                        summary.rows,
                        summary.path.display()
                    ),
                    StatusKind::Info,
                );
                self.last_export = Some(summary.path);
            }
            Err(RosterError::Cancelled) => self.set_status("Export cancelled.", StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.export.is_some() {
                    self.set_status(
                        "An export is still running. Press 'c' to cancel it first.",
                        StatusKind::Error,
                    );
                } else {
                    *exit = true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.students.len().saturating_sub(1),
            KeyCode::Char('a') | KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::Adding(StudentForm::default()));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let selected = self.current_student().cloned();
                match self.service.begin_edit(&mut self.session, selected.as_ref()) {
                    Ok(()) => {
                        self.clear_status();
                        return Ok(Mode::Editing(StudentForm::default()));
                    }
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => match self.current_student().cloned() {
                Some(student) => {
                    return Ok(Mode::ConfirmDelete(ConfirmStudentDelete {
                        index: self.selected,
                        student,
                    }));
                }
                None => self.set_status(
                    surface_error(&RosterError::NoSelection),
                    StatusKind::Error,
                ),
            },
            KeyCode::Char('x') => self.start_export(),
            KeyCode::Char('c') => match &self.export {
                Some(handle) => {
                    handle.cancel();
                    self.set_status("Cancelling export...", StatusKind::Info);
                }
                None => self.set_status("No export is running.", StatusKind::Info),
            },
            KeyCode::Char('o') => self.open_last_export(),
            KeyCode::Char('r') => {
                self.reload_students(None)?;
                self.set_status("Roster reloaded.", StatusKind::Info);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_add(&mut self, code: KeyCode, mut form: StudentForm) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.session.draft.clear();
                self.set_status("Add student cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Enter => match self.service.create(&mut self.session) {
                Ok(student) => {
                    self.after_save(&student, "Added");
                    keep_open = false;
                }
                Err(err) => self.show_form_error(&mut form, &err),
            },
            other => self.edit_form(other, &mut form),
        }

        if keep_open {
            Mode::Adding(form)
        } else {
            Mode::Normal
        }
    }

    fn handle_edit(&mut self, code: KeyCode, mut form: StudentForm) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.service.abandon_edit(&mut self.session);
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Enter => match self.service.commit_edit(&mut self.session) {
                Ok(student) => {
                    self.after_save(&student, "Updated");
                    keep_open = false;
                }
                Err(err) => self.show_form_error(&mut form, &err),
            },
            other => self.edit_form(other, &mut form),
        }

        if keep_open {
            Mode::Editing(form)
        } else {
            Mode::Normal
        }
    }

    /// Field navigation and typing shared by the add and edit forms.
    fn edit_form(&mut self, code: KeyCode, form: &mut StudentForm) {
        match code {
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(&mut self.session.draft),
            KeyCode::Char(ch) => {
                if form.push_char(&mut self.session.draft, ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
    }

    fn show_form_error(&mut self, form: &mut StudentForm, err: &RosterError) {
        if let RosterError::Format { field, .. } = err {
            form.active = *field;
        }
        let message = surface_error(err);
        form.error = Some(message.clone());
        self.set_status(message, StatusKind::Error);
    }

    fn after_save(&mut self, student: &StudentRecord, verb: &str) {
        match self.reload_students(Some(&student.id)) {
            Ok(()) => self.set_status(format!("{verb} {student}."), StatusKind::Info),
            Err(err) => self.set_status(format!("{verb} {student}, but {err}"), StatusKind::Error),
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmStudentDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self
                    .service
                    .delete_from_listing(&mut self.students, Some(confirm.index))
                {
                    Ok(removed) => {
                        self.clamp_selection();
                        self.set_status(format!("Deleted {removed}."), StatusKind::Info);
                        Mode::Normal
                    }
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Mode::ConfirmDelete(confirm)
                    }
                }
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn start_export(&mut self) {
        if self.export.is_some() {
            self.set_status("An export is already running.", StatusKind::Error);
            return;
        }
        match self.service.export(self.export_path.clone()) {
            Ok(handle) => {
                self.set_status(
                    format!("Exporting to {}...", handle.destination().display()),
                    StatusKind::Info,
                );
                self.export = Some(handle);
            }
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn open_last_export(&mut self) {
        let Some(path) = self.last_export.clone() else {
            self.set_status("Nothing exported yet. Press 'x' first.", StatusKind::Error);
            return;
        };
        match open_path(&path) {
            Ok(()) => info!(path = %path.display(), "opened export"),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "could not open export");
                self.set_status(
                    format!("Could not open {}.", path.display()),
                    StatusKind::Error,
                );
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        self.draw_roster(frame, content_area);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Adding(form) => self.draw_student_form(frame, area, "Add Student", form),
            Mode::Editing(form) => self.draw_student_form(frame, area, "Edit Student", form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_roster(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Students ({})", self.students.len()));

        if self.students.is_empty() {
            let message = Paragraph::new("No students yet. Press 'a' to add one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(
            StudentField::ALL
                .iter()
                .map(|field| Cell::from(field.label()))
                .collect::<Vec<_>>(),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.students.iter().map(|student| {
            Row::new(vec![
                Cell::from(student.id.clone()),
                Cell::from(student.first_name.clone()),
                Cell::from(student.last_name.clone()),
                Cell::from(student.email.clone()),
                Cell::from(student.mark.clone()),
            ])
        });

        let widths = [
            Constraint::Percentage(15),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(10),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key = |text: &'static str| Span::styled(text, Style::default().fg(Color::Cyan));
        match &self.mode {
            Mode::Adding(_) | Mode::Editing(_) => Line::from(vec![
                key("Tab"),
                Span::raw(" Next field  "),
                key("Enter"),
                Span::raw(" Save  "),
                key("Esc"),
                Span::raw(" Cancel"),
            ]),
            Mode::ConfirmDelete(_) => Line::from(vec![
                key("Y"),
                Span::raw(" Delete  "),
                key("N"),
                Span::raw(" Keep"),
            ]),
            Mode::Normal => {
                let mut spans = vec![
                    key("a"),
                    Span::raw(" Add  "),
                    key("e"),
                    Span::raw(" Edit  "),
                    key("d"),
                    Span::raw(" Delete  "),
                ];
                match &self.export {
                    Some(handle) if handle.is_cancelled() => {
                        spans.push(Span::raw("Cancelling export...  "));
                    }
                    Some(_) => spans.extend([key("c"), Span::raw(" Cancel export  ")]),
                    None => spans.extend([key("x"), Span::raw(" Export  ")]),
                }
                spans.extend([key("o"), Span::raw(" Open export  "), key("q"), Span::raw(" Quit")]);
                Line::from(spans)
            }
        }
    }

    fn draw_student_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &StudentForm) {
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let draft = &self.session.draft;
        let mut lines: Vec<Line> = StudentField::ALL
            .iter()
            .map(|field| form.build_line(draft, *field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save  Tab to switch  Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        let cursor_x = u16::try_from(form.cursor_offset(draft))
            .unwrap_or(u16::MAX)
            .min(inner.width.saturating_sub(1));
        let cursor_y = u16::try_from(form.cursor_row()).unwrap_or_default();
        frame.set_cursor_position((inner.x + cursor_x, inner.y + cursor_y));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmStudentDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Remove {}?", confirm.student)),
            Line::from("This cannot be undone."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn reload_students(&mut self, focus_id: Option<&str>) -> Result<(), RosterError> {
        self.students = self.service.list_all()?;

        if let Some(id) = focus_id {
            if let Some(idx) = self.students.iter().position(|s| s.id == id) {
                self.selected = idx;
                return Ok(());
            }
        }

        self.clamp_selection();
        Ok(())
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.students.len() {
            self.selected = self.students.len().saturating_sub(1);
        }
    }

    fn current_student(&self) -> Option<&StudentRecord> {
        self.students.get(self.selected)
    }

    fn move_selection(&mut self, offset: isize) {
        if self.students.is_empty() {
            return;
        }
        let last = self.students.len() - 1;
        self.selected = self.selected.saturating_add_signed(offset).min(last);
    }
}
