//! Single-line text editing buffer used by the naming and editing states.

use super::Key;
use crate::output::{RESET, REVERSE};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextInput {
    chars: Vec<char>,
    cursor: usize,
    limit: usize,
}

impl TextInput {
    pub fn new(limit: usize) -> Self {
        Self {
            chars: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    /// A buffer pre-filled with `value`, cursor at the end.
    pub fn with_value(value: &str, limit: usize) -> Self {
        let chars: Vec<char> = value.chars().take(limit).collect();
        let cursor = chars.len();
        Self {
            chars,
            cursor,
            limit,
        }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply an editing key. Returns `false` when the key is not an edit,
    /// leaving the buffer untouched.
    pub fn apply(&mut self, key: Key) -> bool {
        match key {
            Key::Char(c) if !c.is_control() => {
                if self.chars.len() < self.limit {
                    self.chars.insert(self.cursor, c);
                    self.cursor += 1;
                }
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.chars.remove(self.cursor);
                }
            }
            Key::Delete => {
                if self.cursor < self.chars.len() {
                    self.chars.remove(self.cursor);
                }
            }
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.chars.len(),
            Key::CtrlU => {
                self.chars.clear();
                self.cursor = 0;
            }
            _ => return false,
        }
        true
    }

    /// Render with the cursor cell shown in reverse video.
    pub fn view(&self) -> String {
        let before: String = self.chars[..self.cursor].iter().collect();
        let (at, after) = match self.chars.get(self.cursor) {
            Some(c) => (c.to_string(), self.chars[self.cursor + 1..].iter().collect()),
            None => (" ".to_string(), String::new()),
        };
        format!("{before}{REVERSE}{at}{RESET}{after}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str, limit: usize) -> TextInput {
        let mut input = TextInput::new(limit);
        for c in text.chars() {
            input.apply(Key::Char(c));
        }
        input
    }

    #[test]
    fn test_typing_appends() {
        let input = typed("feat: x", 200);
        assert_eq!(input.value(), "feat: x");
        assert_eq!(input.cursor(), 7);
    }

    #[test]
    fn test_limit_is_enforced() {
        let input = typed("abcdef", 4);
        assert_eq!(input.value(), "abcd");
        let prefilled = TextInput::with_value("abcdef", 3);
        assert_eq!(prefilled.value(), "abc");
    }

    #[test]
    fn test_insert_in_middle_and_backspace() {
        let mut input = typed("ac", 10);
        input.apply(Key::Left);
        input.apply(Key::Char('b'));
        assert_eq!(input.value(), "abc");
        input.apply(Key::Backspace);
        assert_eq!(input.value(), "ac");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn test_delete_and_home_end() {
        let mut input = typed("abc", 10);
        input.apply(Key::Home);
        input.apply(Key::Delete);
        assert_eq!(input.value(), "bc");
        input.apply(Key::End);
        assert_eq!(input.cursor(), 2);
        input.apply(Key::Right);
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn test_ctrl_u_clears_line() {
        let mut input = typed("branch", 10);
        assert!(input.apply(Key::CtrlU));
        assert_eq!(input.value(), "");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_non_edit_keys_are_rejected() {
        let mut input = typed("x", 10);
        assert!(!input.apply(Key::Enter));
        assert!(!input.apply(Key::Esc));
        assert!(!input.apply(Key::CtrlC));
        assert_eq!(input.value(), "x");
    }

    #[test]
    fn test_view_marks_cursor() {
        let input = typed("ab", 10);
        assert_eq!(input.view(), format!("ab{REVERSE} {RESET}"));
        let mut input = input;
        input.apply(Key::Home);
        assert_eq!(input.view(), format!("{REVERSE}a{RESET}b"));
    }
}
