//! Shell completion scripts for snap.
//!
//! Scripts are generated from the [`Cli`](crate::cli::Cli) definition with
//! `clap_complete`, printed to stdout or installed into the shell's
//! completion directory.

use crate::cli::Cli;
use crate::error::{Result, SnapError};
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

const BIN_NAME: &str = "snap";

/// Supported shell types for completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            _ => Err(SnapError::ShellCompletion(format!(
                "Unsupported shell: '{}'. Supported shells are: {}.",
                name,
                SUPPORTED_SHELLS.join(", ")
            ))),
        }
    }

    fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the user's shell from `$SHELL`.
pub fn detect_shell() -> Result<ShellType> {
    let shell_path = std::env::var("SHELL").map_err(|_| {
        SnapError::ShellCompletion(
            "$SHELL is not set; pass the shell name explicitly".to_string(),
        )
    })?;
    parse_shell_from_path(&shell_path)
}

/// Shell type from a path such as `/usr/local/bin/fish`.
pub fn parse_shell_from_path(shell_path: &str) -> Result<ShellType> {
    let shell_name = Path::new(shell_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(shell_path);
    ShellType::from_name(shell_name)
}

/// Where the completion script for `shell` is installed under `home`.
fn completion_path_in(home: &Path, shell: ShellType) -> PathBuf {
    match shell {
        ShellType::Bash => {
            let xdg = home.join(".local/share/bash-completion/completions");
            if xdg.exists() {
                xdg.join(BIN_NAME)
            } else {
                home.join(".bash_completion.d").join(BIN_NAME)
            }
        }
        ShellType::Zsh => home.join(".zfunc").join(format!("_{}", BIN_NAME)),
        ShellType::Fish => home
            .join(".config/fish/completions")
            .join(format!("{}.fish", BIN_NAME)),
    }
}

pub fn get_completion_path(shell: ShellType) -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SnapError::ShellCompletion("Could not determine home directory".to_string()))?;
    Ok(completion_path_in(&home, shell))
}

pub fn generate_completion_script(shell: ShellType) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), &mut cmd, BIN_NAME, &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

pub fn print_completion_script(shell: ShellType) {
    print!("{}", generate_completion_script(shell));
}

/// Result of installing a completion script.
#[derive(Debug)]
pub struct InstallResult {
    pub shell: ShellType,
    pub path: PathBuf,
    /// Extra shell setup the user still has to do, if any.
    pub setup_instructions: Option<String>,
}

fn write_completion_script(shell: ShellType, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SnapError::ShellCompletion(format!(
                "Failed to create completion directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    fs::write(path, generate_completion_script(shell)).map_err(|e| {
        SnapError::ShellCompletion(format!(
            "Failed to write completion script to '{}': {}",
            path.display(),
            e
        ))
    })
}

fn setup_instructions(shell: ShellType) -> Option<String> {
    match shell {
        ShellType::Zsh => Some(
            "Add this to ~/.zshrc if ~/.zfunc is not on your fpath yet:\n  \
             fpath=(~/.zfunc $fpath)\n  autoload -Uz compinit && compinit"
                .to_string(),
        ),
        ShellType::Bash | ShellType::Fish => None,
    }
}

/// Install the completion script for `shell`.
pub fn install_completions(shell: ShellType) -> Result<InstallResult> {
    let path = get_completion_path(shell)?;
    write_completion_script(shell, &path)?;
    tracing::info!(%shell, path = %path.display(), "installed completions");
    Ok(InstallResult {
        shell,
        path,
        setup_instructions: setup_instructions(shell),
    })
}
