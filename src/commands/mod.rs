//! CLI command handlers for snap.
//!
//! Plain commands print and return. Interactive commands run a flow on the
//! terminal and return the exit code of the finished session.
//!
//! # Commands
//!
//! - [`init`] - Create a repository
//! - [`changes`] - Colored working tree status
//! - [`config`] - Show or edit settings
//! - [`completions`] - Print or install shell completions
//! - [`interactive`] - save, branch, replay, stack, tags and sync

mod changes;
mod completions;
mod config;
mod init;
mod interactive;

pub use changes::{changes_command, format_status};
pub use completions::completions_command;
pub use config::{config_path_command, config_set_command, config_show_command};
pub use init::init_command;
pub use interactive::{
    branch_command, replay_command, run_flow, save_command, stack_command, sync_command,
    tags_command, tags_create_command, tags_diff_command,
};
