use std::time::Duration;
use tracing::trace;

use crate::domain::{BSConfig, BSError, Message};
use crate::model::Model;
use crate::row::{FILTER_POSITION, FILTER_SCHOOL, SORT_NAME, SORT_NIL, SORT_RANK};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &BSConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to one poll interval. No input still yields a `Tick` so the
    /// model can fire a pending debounced search.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, BSError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(Some(Message::Tick));
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(Self::handle_key(key))
                }
            }
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    fn handle_key(key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('p') => Some(Message::CycleFilter(FILTER_POSITION, true)),
            KeyCode::Char('P') => Some(Message::CycleFilter(FILTER_POSITION, false)),
            KeyCode::Char('s') => Some(Message::CycleFilter(FILTER_SCHOOL, true)),
            KeyCode::Char('S') => Some(Message::CycleFilter(FILTER_SCHOOL, false)),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Char('r') => Some(Message::Sort(SORT_RANK)),
            KeyCode::Char('n') => Some(Message::Sort(SORT_NAME)),
            KeyCode::Char('v') => Some(Message::Sort(SORT_NIL)),
            KeyCode::Tab | KeyCode::Char('t') => Some(Message::ToggleView),
            KeyCode::Char('T') => Some(Message::ToggleTheme),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::Char('G') | KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
