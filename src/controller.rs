use std::time::Duration;
use tracing::trace;

use crate::domain::{DTVConfig, DTVError, Message};
use crate::model::Model;
use crate::record::Field;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DTVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DTVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                // crossterm also emits key release and repeat events on Windows
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(self.handle_key(key, model.raw_keyevents()));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('x') => Some(Message::ClearSearch),
            KeyCode::Char(':') => Some(Message::EnterPage),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('c') => Some(Message::CopyRow),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char(c @ '1'..='7') => c
                .to_digit(10)
                .and_then(|d| Field::ALL.get(d as usize - 1))
                .map(|&f| Message::ToggleColumn(f)),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
