//! `snap replay <branch>`: rebase the current branch onto another after
//! showing which commits will move.

use super::{render_failure, Outcome};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step};
use crate::error::Cause;
use crate::git::{self, CommitInfo};
use crate::output::{
    key_hints, success_line, title, truncate, ARROW, BOLD, CYAN, GRAY, RESET, WARN, YELLOW,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Init,
    CheckingPriorOp,
    Listing,
    ShowingPlan,
    Replaying,
    Done,
    /// Stopped on conflicts; the user resolves them with git.
    Conflict,
    Closed,
    Error,
}

impl FlowState for ReplayState {
    const INITIAL: Self = ReplayState::Init;
    const CLOSED: Self = ReplayState::Closed;
    const FAILED: Self = ReplayState::Error;

    fn is_terminal(self) -> bool {
        matches!(
            self,
            ReplayState::Done | ReplayState::Conflict | ReplayState::Closed | ReplayState::Error
        )
    }

    fn is_in_flight(self) -> bool {
        matches!(
            self,
            ReplayState::CheckingPriorOp | ReplayState::Listing | ReplayState::Replaying
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPayload {
    pub onto: String,
    pub current_branch: String,
    /// Commits to move, oldest first.
    pub commits: Vec<CommitInfo>,
    /// Git's report from the rebase.
    pub output: String,
}

impl ReplayPayload {
    pub fn new(onto: impl Into<String>) -> Self {
        Self {
            onto: onto.into(),
            current_branch: String::new(),
            commits: Vec::new(),
            output: String::new(),
        }
    }
}

/// Repository state read before anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorOp {
    pub rebase_in_progress: bool,
    pub current_branch: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEffect {
    CheckPriorOp,
    ListCommits { onto: String },
    Rebase { onto: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    Checked(Outcome<PriorOp>),
    Listed(Outcome<Vec<CommitInfo>>),
    Replayed(Outcome<String>),
}

/// Only consulted when the rebase failed.
fn mentions_conflict(text: &str) -> bool {
    text.contains("CONFLICT") || text.contains("conflict")
}

pub struct ReplayFlow;

impl Flow for ReplayFlow {
    type State = ReplayState;
    type Payload = ReplayPayload;
    type Effect = ReplayEffect;
    type Outcome = ReplayOutcome;

    const NAME: &'static str = "replay";

    fn start(session: &Session<Self>) -> Step<Self> {
        Step::run(
            session.goto(ReplayState::CheckingPriorOp),
            ReplayEffect::CheckPriorOp,
        )
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        if session.state != ReplayState::ShowingPlan {
            return None;
        }
        match key {
            Key::Char('y') | Key::Char('Y') | Key::Enter => Some(Step::run(
                session.goto(ReplayState::Replaying),
                ReplayEffect::Rebase {
                    onto: session.payload.onto.clone(),
                },
            )),
            Key::Char('n') | Key::Char('N') | Key::Char('q') | Key::CtrlC => {
                Some(Step::idle(session.fail(Cause::cancelled("replay"))))
            }
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: ReplayOutcome) -> Step<Self> {
        let onto = &session.payload.onto;
        match (session.state, outcome) {
            (ReplayState::CheckingPriorOp, ReplayOutcome::Checked(Ok(prior))) => {
                if prior.rebase_in_progress {
                    return Step::idle(session.fail(Cause::precondition(
                        "rebase already in progress. Use 'git rebase --continue', '--skip', or '--abort'",
                    )));
                }
                if prior.current_branch == *onto {
                    return Step::idle(session.fail(Cause::precondition(format!(
                        "already on branch '{}', nothing to replay",
                        onto
                    ))));
                }
                let mut next = session.goto(ReplayState::Listing);
                next.payload.current_branch = prior.current_branch;
                Step::run(next, ReplayEffect::ListCommits { onto: onto.clone() })
            }
            (ReplayState::Listing, ReplayOutcome::Listed(Ok(mut commits))) => {
                if commits.is_empty() {
                    return Step::idle(session.fail(Cause::domain(format!(
                        "no commits to replay (already up to date with '{}')",
                        onto
                    ))));
                }
                commits.reverse();
                let mut next = session.goto(ReplayState::ShowingPlan);
                next.payload.commits = commits;
                Step::idle(next)
            }
            (ReplayState::Replaying, ReplayOutcome::Replayed(Ok(output))) => {
                let mut next = session.goto(ReplayState::Done);
                next.payload.output = output;
                Step::idle(next)
            }
            (ReplayState::Replaying, ReplayOutcome::Replayed(Err(err))) => {
                let mut next = session.clone();
                next.payload.output = err.0.clone();
                if mentions_conflict(&err.0) {
                    Step::idle(next.goto(ReplayState::Conflict))
                } else {
                    Step::idle(next.fail(err.into()))
                }
            }
            (_, ReplayOutcome::Checked(Err(err)) | ReplayOutcome::Listed(Err(err))) => {
                Step::idle(session.fail(err.into()))
            }
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        let payload = &session.payload;
        let count = payload.commits.len();
        match session.state {
            ReplayState::Init | ReplayState::Closed => String::new(),
            ReplayState::CheckingPriorOp => "Checking repository state...".to_string(),
            ReplayState::Listing => format!("Finding commits to replay onto '{}'...", payload.onto),
            ReplayState::ShowingPlan => {
                let width = usize::from(session.width).saturating_sub(14).max(20);
                let mut out = format!(
                    "\n{}\n\n{} {ARROW} {BOLD}{}{RESET}\n\n",
                    title(&format!("Replay {} commit(s)", count)),
                    payload.current_branch,
                    payload.onto
                );
                for commit in &payload.commits {
                    out.push_str(&format!(
                        "  {YELLOW}{}{RESET} {}\n",
                        commit.short_hash,
                        truncate(&commit.message, width)
                    ));
                }
                out.push('\n');
                out.push_str(&key_hints(&[("y/enter", "replay"), ("n", "cancel")]));
                out
            }
            ReplayState::Replaying => format!("Replaying {} commit(s) onto '{}'...", count, payload.onto),
            ReplayState::Done => success_line(&format!(
                "Successfully replayed {} commit(s) onto '{}'",
                count, payload.onto
            )),
            ReplayState::Conflict => format!(
                "{YELLOW}{BOLD}{WARN} Replay stopped on conflicts{RESET}\n\n{GRAY}{}{RESET}\n\n\
                 Resolve the conflicted files, then:\n  \
                 {CYAN}git add <files>{RESET} and {CYAN}git rebase --continue{RESET}\n  \
                 or {CYAN}git rebase --abort{RESET} to give up\n",
                payload.output.trim()
            ),
            ReplayState::Error => {
                let mut out = render_failure(session.last_error.as_ref());
                if !payload.output.trim().is_empty() {
                    out.push_str(&format!("\n{GRAY}{}{RESET}\n", payload.output.trim()));
                }
                out
            }
        }
    }

    fn perform(effect: ReplayEffect, _services: &Services) -> ReplayOutcome {
        match effect {
            ReplayEffect::CheckPriorOp => ReplayOutcome::Checked(super::effect(
                git::rebase_in_progress().and_then(|rebase_in_progress| {
                    Ok(PriorOp {
                        rebase_in_progress,
                        current_branch: git::current_branch()?,
                    })
                }),
            )),
            ReplayEffect::ListCommits { onto } => {
                ReplayOutcome::Listed(super::effect(git::replay_commits(&onto)))
            }
            ReplayEffect::Rebase { onto } => {
                ReplayOutcome::Replayed(super::effect(git::rebase_onto(&onto)))
            }
        }
    }
}
