//! Init command handler.
//!
//! Creates a git repository in the current directory.

use crate::error::Result;
use crate::git;
use crate::output::{BOLD, CYAN, GREEN, RESET};

/// Run `git init` here, refusing inside an existing repository.
pub fn init_command() -> Result<()> {
    git::init_repo()?;
    tracing::info!("initialized repository");

    println!("{GREEN}{BOLD}✓ Initialized a new git repository{RESET}");
    println!();
    println!("{BOLD}Next steps:{RESET}");
    println!("  {CYAN}snap changes{RESET}  see what is in the working tree");
    println!("  {CYAN}snap save{RESET}     make the first commit");
    Ok(())
}
