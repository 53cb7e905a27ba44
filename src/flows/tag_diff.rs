//! `snap tags diff`: commits since the latest tag with their line counts.

use super::{help_footer, render_failure, window, Outcome, PAGE_SIZE};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step};
use crate::error::{Cause, Result};
use crate::git::{self, CommitInfo, DiffStats};
use crate::output::{title, truncate, CYAN, GRAY, GREEN, POINTER, RED, RESET, YELLOW};

#[derive(Debug, Clone, PartialEq)]
pub struct CommitWithStats {
    pub commit: CommitInfo,
    pub stats: DiffStats,
}

/// Commits on HEAD since the most recent tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReleaseChanges {
    pub previous_tag: Option<String>,
    /// Newest first.
    pub commits: Vec<CommitWithStats>,
}

impl ReleaseChanges {
    /// Totals over every commit.
    pub fn totals(&self) -> DiffStats {
        self.commits.iter().fold(DiffStats::default(), |acc, c| DiffStats {
            files: acc.files + c.stats.files,
            additions: acc.additions + c.stats.additions,
            deletions: acc.deletions + c.stats.deletions,
        })
    }

    /// How the range is described to the user.
    pub fn since(&self) -> &str {
        self.previous_tag.as_deref().unwrap_or("the first commit")
    }
}

/// Read the commits since the latest tag, each with its own diff stats.
pub fn load_release_changes() -> Result<ReleaseChanges> {
    let previous_tag = git::latest_tag()?;
    let from = previous_tag.clone().unwrap_or_default();
    let commits = git::commits_between(&from, "HEAD")?
        .into_iter()
        .map(|commit| {
            let stats = git::commit_stats(&commit.hash)?;
            Ok(CommitWithStats { commit, stats })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ReleaseChanges {
        previous_tag,
        commits,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagDiffState {
    Init,
    Loading,
    Browsing,
    Closed,
    Error,
}

impl FlowState for TagDiffState {
    const INITIAL: Self = TagDiffState::Init;
    const CLOSED: Self = TagDiffState::Closed;
    const FAILED: Self = TagDiffState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, TagDiffState::Closed | TagDiffState::Error)
    }

    fn is_in_flight(self) -> bool {
        self == TagDiffState::Loading
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagDiffPayload {
    pub changes: ReleaseChanges,
    pub cursor: usize,
    pub show_help: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagDiffEffect {
    Load,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagDiffOutcome {
    Loaded(Outcome<ReleaseChanges>),
}

pub struct TagDiffFlow;

impl Flow for TagDiffFlow {
    type State = TagDiffState;
    type Payload = TagDiffPayload;
    type Effect = TagDiffEffect;
    type Outcome = TagDiffOutcome;

    const NAME: &'static str = "tag-diff";

    fn start(session: &Session<Self>) -> Step<Self> {
        Step::run(session.goto(TagDiffState::Loading), TagDiffEffect::Load)
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        if session.state != TagDiffState::Browsing {
            return None;
        }
        let last = session.payload.changes.commits.len().saturating_sub(1);
        let mut next = session.clone();
        let payload = &mut next.payload;
        match key {
            k if k.is_up() => payload.cursor = payload.cursor.saturating_sub(1),
            k if k.is_down() => payload.cursor = (payload.cursor + 1).min(last),
            Key::Char('g') | Key::Home => payload.cursor = 0,
            Key::Char('G') | Key::End => payload.cursor = last,
            Key::Char('?') => payload.show_help = !payload.show_help,
            _ => return None,
        }
        Some(Step::idle(next))
    }

    fn on_outcome(session: &Session<Self>, outcome: TagDiffOutcome) -> Step<Self> {
        match outcome {
            TagDiffOutcome::Loaded(Ok(changes)) => {
                if changes.commits.is_empty() {
                    let message = match &changes.previous_tag {
                        Some(tag) => format!("no commits since {}", tag),
                        None => "no commits found".to_string(),
                    };
                    return Step::idle(session.fail(Cause::domain(message)));
                }
                let mut next = session.goto(TagDiffState::Browsing);
                next.payload.changes = changes;
                next.payload.cursor = 0;
                Step::idle(next)
            }
            TagDiffOutcome::Loaded(Err(err)) => Step::idle(session.fail(err.into())),
        }
    }

    fn render(session: &Session<Self>) -> String {
        match session.state {
            TagDiffState::Init | TagDiffState::Closed => String::new(),
            TagDiffState::Loading => "Collecting changes since the latest tag...".to_string(),
            TagDiffState::Browsing => render_changes(session),
            TagDiffState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: TagDiffEffect, _services: &Services) -> TagDiffOutcome {
        match effect {
            TagDiffEffect::Load => TagDiffOutcome::Loaded(super::effect(load_release_changes())),
        }
    }
}

/// One commit row: hash, subject and its line counts.
pub(crate) fn commit_row(entry: &CommitWithStats, selected: bool, width: usize) -> String {
    let pointer = if selected {
        format!("{CYAN}{POINTER}{RESET}")
    } else {
        " ".to_string()
    };
    let counts = format!("+{} -{}", entry.stats.additions, entry.stats.deletions);
    let room = width.saturating_sub(counts.len() + entry.commit.short_hash.len() + 8);
    format!(
        "{} {YELLOW}{}{RESET} {} {GREEN}+{}{RESET} {RED}-{}{RESET}\n",
        pointer,
        entry.commit.short_hash,
        truncate(&entry.commit.message, room.max(10)),
        entry.stats.additions,
        entry.stats.deletions
    )
}

pub(crate) fn summary_line(changes: &ReleaseChanges) -> String {
    let totals = changes.totals();
    format!(
        "{GRAY}{} commit(s), {} file change(s),{RESET} {GREEN}+{}{RESET} {RED}-{}{RESET}\n",
        changes.commits.len(),
        totals.files,
        totals.additions,
        totals.deletions
    )
}

fn render_changes(session: &Session<TagDiffFlow>) -> String {
    let payload = &session.payload;
    let changes = &payload.changes;
    let mut out = format!(
        "\n{}\n\n",
        title(&format!("Changes since {}", changes.since()))
    );
    let width = usize::from(session.width);
    for idx in window(changes.commits.len(), payload.cursor, PAGE_SIZE) {
        out.push_str(&commit_row(&changes.commits[idx], idx == payload.cursor, width));
    }
    out.push('\n');
    out.push_str(&summary_line(changes));
    out.push('\n');
    out.push_str(&help_footer(
        payload.show_help,
        &[("↑/k ↓/j", "move"), ("g/G", "top/bottom"), ("q", "quit")],
    ));
    out
}
