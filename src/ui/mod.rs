//! Ratatui front-end: a roster table with add/edit popups, a delete
//! confirmation and background export. All record rules are delegated to
//! `RecordService`; this layer only turns outcomes into status lines.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
