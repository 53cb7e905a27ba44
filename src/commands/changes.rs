//! Changes command handler: a colored `git status --short`.

use crate::error::Result;
use crate::git;
use crate::output::{BLUE, CYAN, GRAY, GREEN, MAGENTA, RED, RESET, YELLOW};

/// How one status code is presented.
fn describe(code: &str) -> (&'static str, &'static str) {
    let code = code.trim();
    if code == "??" {
        return ("untracked", GRAY);
    }
    match code.chars().find(|c| *c != ' ') {
        Some('A') => ("added", GREEN),
        Some('M') => ("modified", YELLOW),
        Some('D') => ("deleted", RED),
        Some('R') => ("renamed", BLUE),
        Some('C') => ("copied", CYAN),
        Some('U') => ("conflict", MAGENTA),
        _ => ("changed", RESET),
    }
}

/// Format `git status --short` output, one colored line per path.
pub fn format_status(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let (code, path) = line.split_at(2);
            let (label, color) = describe(code);
            format!("  {color}{:<10}{RESET} {}", label, path.trim_start())
        })
        .collect()
}

pub fn changes_command() -> Result<()> {
    git::require_repo()?;
    let lines = format_status(&git::status_short()?);
    if lines.is_empty() {
        println!("{GREEN}No changes - everything is clean!{RESET}");
        return Ok(());
    }
    println!("Changes on {CYAN}{}{RESET}:", git::current_branch()?);
    println!();
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
