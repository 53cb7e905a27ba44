//! Terminal presentation for snap.
//!
//! Colors, glyphs and width helpers shared by the flow renderers and the
//! non-interactive commands. Nothing here holds state.
//!
//! - [`messages`] - error, warning, info and success lines

pub mod messages;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

pub use messages::{print_error, print_info, print_success, print_warning};

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const REVERSE: &str = "\x1b[7m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";
pub const WARN: &str = "⚠";
pub const POINTER: &str = "❯";
pub const ARROW: &str = "→";

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub fn spinner_frame(tick: usize) -> char {
    let count = SPINNER_CHARS.chars().count();
    SPINNER_CHARS.chars().nth(tick % count).unwrap_or(' ')
}

/// Columns one grapheme cluster takes; wide CJK and emoji count two.
fn grapheme_width(grapheme: &str) -> usize {
    grapheme
        .chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .sum()
}

/// `s` with ANSI SGR escapes removed.
pub fn strip_ansi(s: &str) -> String {
    let mut plain = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => plain.push(c),
        }
    }
    plain
}

/// Number of terminal columns `s` occupies, ignoring ANSI escapes.
pub fn visible_width(s: &str) -> usize {
    strip_ansi(s).graphemes(true).map(grapheme_width).sum()
}

/// Cut plain text to `max_cols` columns, marking the cut with "...".
pub fn truncate(s: &str, max_cols: usize) -> String {
    if visible_width(s) <= max_cols {
        return s.to_string();
    }
    let budget = if max_cols <= 3 { max_cols } else { max_cols - 3 };
    let mut kept = String::new();
    let mut used = 0;
    for grapheme in s.graphemes(true) {
        let width = grapheme_width(grapheme);
        if used + width > budget {
            break;
        }
        used += width;
        kept.push_str(grapheme);
    }
    if max_cols <= 3 {
        kept
    } else {
        format!("{}...", kept.trim_end())
    }
}

/// Pad plain text on the right to `width` columns.
pub fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

/// The one-line header every flow starts its render with.
pub fn title(text: &str) -> String {
    format!("{BOLD}{MAGENTA}{text}{RESET}")
}

/// Footer line listing the keys a state accepts.
pub fn key_hints(hints: &[(&str, &str)]) -> String {
    let parts: Vec<String> = hints
        .iter()
        .map(|(key, action)| format!("{BOLD}{key}{RESET}{GRAY} {action}{RESET}"))
        .collect();
    parts.join(&format!("{GRAY} • {RESET}"))
}

/// Red error block used by every flow's failure state.
pub fn error_block(message: &str) -> String {
    format!("{RED}{BOLD}{CROSS} Error:{RESET} {RED}{message}{RESET}\n")
}

pub fn success_line(message: &str) -> String {
    format!("{GREEN}{BOLD}{CHECK} {message}{RESET}\n")
}
