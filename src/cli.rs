//! Command-line definition.
//!
//! Lives in the library so shell completion generation sees the same
//! command tree the binary parses.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "snap")]
#[command(
    version,
    about = "Git made friendly: AI commit messages and interactive branch, history and tag views",
    arg_required_else_help = true,
    after_help = "EXAMPLES:
    snap save                     # Stage everything, draft a message, confirm and commit
    snap save \"fix: typo\"         # Commit with your own message
    snap stack --mine             # Browse your own commits
    snap branch new feature/login # Create and switch to a branch
    snap replay main              # Rebase the current branch onto main
    snap tags create v1.2.0       # Tag and push a release
    snap sync                     # Pull, then push

LOGGING:
    Set SNAP_LOG=debug (or pass --verbose) to write a log to ~/.config/snap/snap.log"
)]
pub struct Cli {
    /// Write debug logs to ~/.config/snap/snap.log
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Create a git repository in the current directory
    Init,

    /// Stage all changes and commit with a generated (or given) message
    #[command(after_help = "EXAMPLES:
    snap save                   # Generate a message with Ollama
    snap save \"feat: add login\" # Use this message
    snap save -m \"fix: typo\"    # Same, as a flag
    snap save --seed 7          # Different seed, different suggestion

KEYS:
    y commit   n cancel   e edit the message")]
    Save {
        /// Commit message to use instead of generating one
        message: Option<String>,

        /// Commit message to use instead of generating one
        #[arg(short = 'm', long = "message", conflicts_with = "message")]
        message_flag: Option<String>,

        /// Seed for message generation (defaults to the configured seed)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the working tree status
    Changes,

    /// Pull then push the current branch
    Sync {
        /// Only pull
        #[arg(long)]
        from: bool,
    },

    /// Browse commit history and check out a commit
    #[command(after_help = "KEYS:
    ↑/k ↓/j move   g/G top/bottom   / filter   c clear filter   enter checkout   ? help")]
    Stack {
        /// Include commits from every branch
        #[arg(short, long)]
        all: bool,

        /// Only your own commits (by git user.name)
        #[arg(long)]
        mine: bool,

        /// Number of commits to load (defaults to the configured stack_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only commits touching this path
        path: Option<String>,
    },

    /// List, create, switch and delete branches
    #[command(after_help = "EXAMPLES:
    snap branch                 # Interactive branch list
    snap branch new             # Prompt for a name
    snap branch new topic       # Create and switch
    snap branch switch main
    snap branch delete topic")]
    Branch {
        #[command(subcommand)]
        action: Option<BranchAction>,
    },

    /// Rebase the current branch onto another branch
    Replay {
        /// Branch to replay onto
        branch: String,
    },

    /// Browse tags, review unreleased changes, create release tags
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Show or change the configuration
    #[command(after_help = "VALID KEYS:
    ollama_url            Ollama server URL
    model                 Model used for commit messages
    temperature           Sampling temperature (0-2)
    seed                  Default generation seed
    request_timeout_secs  Seconds to wait for Ollama
    chunk_threshold       Diff size (bytes) above which files are summarised first
    stack_limit           Default number of commits in 'snap stack'")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Print or install a shell completion script
    Completions {
        /// bash, zsh or fish (detected from $SHELL when omitted)
        shell: Option<String>,

        /// Write the script to the shell's completion directory
        #[arg(long)]
        install: bool,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum BranchAction {
    /// Create a branch and switch to it
    #[command(alias = "create")]
    New {
        /// Branch name (prompted for when omitted)
        name: Option<String>,
    },

    /// Switch to an existing branch
    #[command(alias = "checkout")]
    Switch { name: String },

    /// Delete a local branch
    #[command(alias = "remove")]
    Delete { name: String },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum TagsAction {
    /// Commits since the latest tag
    Diff,

    /// Create an annotated tag and push it
    Create {
        /// Tag name, e.g. v1.2.0
        name: String,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print the effective configuration (the default)
    Show,

    /// Set one key
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}
