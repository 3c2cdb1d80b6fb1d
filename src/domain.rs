use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error;
use std::path::PathBuf;
use std::time::Duration;

use crate::debounce::DEFAULT_SEARCH_DEBOUNCE;
use crate::table_controller::View;
use crate::theme::Theme;

#[derive(Debug)]
pub enum BSError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for BSError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BSError::IoError(e) => write!(f, "I/O error: {e}"),
            BSError::PolarsError(e) => write!(f, "could not read table: {e}"),
            BSError::JsonError(e) => write!(f, "could not parse export: {e}"),
            BSError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            BSError::FileNotFound => write!(f, "file not found"),
            BSError::PermissionDenied => write!(f, "permission denied"),
            BSError::UnknownFileType => {
                write!(f, "unknown file type, expected csv, parquet, arrow or json")
            }
        }
    }
}

impl std::error::Error for BSError {}

impl From<Error> for BSError {
    fn from(err: Error) -> Self {
        BSError::IoError(err)
    }
}

impl From<PolarsError> for BSError {
    fn from(err: PolarsError) -> Self {
        BSError::PolarsError(err)
    }
}

impl From<serde_json::Error> for BSError {
    fn from(err: serde_json::Error) -> Self {
        BSError::JsonError(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Tick,
    Resize(usize, usize),
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Search,
    RawKey(KeyEvent),
    CycleFilter(&'static str, bool),
    ClearFilters,
    Sort(&'static str),
    ToggleView,
    ToggleTheme,
    CopyRow,
    Help,
    Exit,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct BSConfig {
    pub event_poll_time: u64,
    pub search_debounce: Duration,
    pub initial_view: View,
    pub theme: Option<Theme>,
    pub theme_file: Option<PathBuf>,
    pub show_rank: bool,
    pub card_width: usize,
}

impl Default for BSConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            initial_view: View::Table,
            theme: None,
            theme_file: None,
            show_rank: true,
            card_width: 30,
        }
    }
}

pub const HELP_TEXT: &str = "\
Ball Street athlete database

  /            search name, position and school
  p / P        next / previous position filter
  s / S        next / previous school filter
  c            clear search and filters
  r  n  v      sort by rank, name, NIL value (again to flip)
  Tab / t      switch between table and cards
  T            toggle dark / light theme
  j k ↑ ↓      move selection
  PgUp PgDn    page up / down
  g / G        first / last athlete
  y            copy selected athlete as CSV
  ?            this help
  Esc          close popup / leave search
  q            quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters_chain() {
        let cfg = BSConfig::default()
            .with_initial_view(View::Cards)
            .with_search_debounce(Duration::from_millis(50))
            .with_theme(Some(Theme::Light));
        assert_eq!(cfg.initial_view, View::Cards);
        assert_eq!(cfg.search_debounce, Duration::from_millis(50));
        assert_eq!(cfg.theme, Some(Theme::Light));
        assert_eq!(cfg.event_poll_time, 100);
    }

    #[test]
    fn errors_render_for_humans() {
        assert_eq!(BSError::FileNotFound.to_string(), "file not found");
        let io: BSError = Error::other("boom").into();
        assert!(io.to_string().contains("boom"));
    }
}
