//! Completions command handler.

use crate::completion::{detect_shell, install_completions, print_completion_script, ShellType};
use crate::error::Result;
use crate::output::{GREEN, RESET, YELLOW};

/// Print the script for `shell` (or the detected shell), or install it.
pub fn completions_command(shell: Option<&str>, install: bool) -> Result<()> {
    let shell = match shell {
        Some(name) => ShellType::from_name(name)?,
        None => detect_shell()?,
    };
    if !install {
        print_completion_script(shell);
        return Ok(());
    }

    let result = install_completions(shell)?;
    println!(
        "{GREEN}Installed{RESET} {} completions to {}",
        result.shell,
        result.path.display()
    );
    if let Some(instructions) = result.setup_instructions {
        println!();
        println!("{YELLOW}Note:{RESET} {}", instructions);
    }
    Ok(())
}
