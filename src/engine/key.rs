//! Key tokens fed to sessions.
//!
//! Sessions never see raw terminal events; the driver translates crossterm
//! key events into this closed set first.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Tab,
    CtrlC,
    CtrlU,
}

impl Key {
    /// Translate a crossterm key event. Returns `None` for keys no flow uses.
    pub fn from_event(event: KeyEvent) -> Option<Key> {
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return match event.code {
                KeyCode::Char('c') => Some(Key::CtrlC),
                KeyCode::Char('u') => Some(Key::CtrlU),
                _ => None,
            };
        }

        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Tab => Key::Tab,
            _ => return None,
        };
        Some(key)
    }

    /// The generic quit tokens, honored wherever a flow does not claim them.
    pub fn is_quit(self) -> bool {
        matches!(self, Key::CtrlC | Key::Char('q'))
    }

    pub fn is_up(self) -> bool {
        matches!(self, Key::Up | Key::Char('k'))
    }

    pub fn is_down(self) -> bool {
        matches!(self, Key::Down | Key::Char('j'))
    }

    /// Parse a compact key name such as `"y"`, `"enter"` or `"ctrl+c"`.
    ///
    /// Used by tests to script sessions.
    pub fn parse(name: &str) -> Option<Key> {
        let key = match name {
            "enter" => Key::Enter,
            "esc" => Key::Esc,
            "backspace" => Key::Backspace,
            "delete" => Key::Delete,
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            "home" => Key::Home,
            "end" => Key::End,
            "tab" => Key::Tab,
            "ctrl+c" => Key::CtrlC,
            "ctrl+u" => Key::CtrlU,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}
