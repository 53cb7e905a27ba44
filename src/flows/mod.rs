//! The interactive workflows, each a [`Flow`](crate::engine::Flow) run by
//! the shared engine.
//!
//! - [`save`] - stage, draft a message, confirm or edit, commit
//! - [`branch`] - list, create, switch and delete branches
//! - [`replay`] - rebase the current branch onto another
//! - [`stack`] - browse and filter history, check out a commit
//! - [`tags`] - browse tags and inspect one
//! - [`tag_diff`] - commits since the latest tag
//! - [`tag_create`] - create and push an annotated release tag
//! - [`sync`] - pull then push the current branch

pub mod branch;
pub mod replay;
pub mod save;
pub mod stack;
pub mod sync;
pub mod tag_create;
pub mod tag_diff;
pub mod tags;

pub use branch::{BranchCommand, BranchFlow};
pub use replay::ReplayFlow;
pub use save::SaveFlow;
pub use stack::{StackFlow, StackQuery};
pub use sync::SyncFlow;
pub use tag_create::TagCreateFlow;
pub use tag_diff::TagDiffFlow;
pub use tags::TagsFlow;

use crate::engine::Searchable;
use crate::error::{Cause, EffectError};
use crate::git::{CommitInfo, TagInfo};
use crate::output::{error_block, key_hints, GRAY, RESET, YELLOW};
use std::ops::Range;

/// Rows of a list shown at once.
pub(crate) const PAGE_SIZE: usize = 15;

/// Outcome payload of a git-backed effect.
pub(crate) type Outcome<T> = Result<T, EffectError>;

pub(crate) fn effect<T>(result: crate::error::Result<T>) -> Outcome<T> {
    result.map_err(EffectError::from)
}

/// Render of a failed session. Cancellations are not errors to the user.
pub(crate) fn render_failure(cause: Option<&Cause>) -> String {
    match cause {
        Some(cause @ Cause::Cancelled(_)) => format!("{YELLOW}{}{RESET}\n", cause),
        Some(cause) => error_block(&cause.to_string()),
        None => error_block("unknown error"),
    }
}

/// The slice of a list to draw so the cursor row stays visible.
pub(crate) fn window(len: usize, cursor: usize, rows: usize) -> Range<usize> {
    if len <= rows {
        return 0..len;
    }
    let start = (cursor + 1).saturating_sub(rows);
    start..(start + rows).min(len)
}

/// Full key list when help is shown, otherwise a hint to press `?`.
pub(crate) fn help_footer(show_help: bool, hints: &[(&str, &str)]) -> String {
    if show_help {
        key_hints(hints)
    } else {
        format!("{GRAY}Press ? for help{RESET}")
    }
}

impl Searchable for CommitInfo {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.message.as_str(),
            self.hash.as_str(),
            self.short_hash.as_str(),
            self.author.as_str(),
        ]
    }
}

impl Searchable for TagInfo {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.message.as_str(),
            self.short_hash.as_str(),
        ]
    }
}
