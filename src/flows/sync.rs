//! `snap sync`: pull, then push the current branch.

use super::{render_failure, Outcome};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step};
use crate::error::{Cause, Result};
use crate::git;
use crate::output::success_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Checking,
    Pulling,
    Pushing,
    Done,
    Closed,
    Error,
}

impl FlowState for SyncState {
    const INITIAL: Self = SyncState::Init;
    const CLOSED: Self = SyncState::Closed;
    const FAILED: Self = SyncState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, SyncState::Done | SyncState::Closed | SyncState::Error)
    }

    fn is_in_flight(self) -> bool {
        matches!(self, SyncState::Checking | SyncState::Pulling | SyncState::Pushing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncPayload {
    /// `--from`: stop after pulling.
    pub pull_only: bool,
    pub branch: String,
    /// `Some(true)` when the pull brought new commits; `None` when skipped.
    pub pulled: Option<bool>,
    pub pushed: Option<bool>,
    /// The push created the upstream branch.
    pub set_upstream: bool,
}

impl SyncPayload {
    pub fn new(pull_only: bool) -> Self {
        Self {
            pull_only,
            ..Self::default()
        }
    }
}

/// Repository facts gathered before touching the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCheck {
    pub has_remote: bool,
    pub uncommitted: bool,
    pub branch: String,
    pub has_upstream: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    Check,
    Pull,
    Push { branch: String, set_upstream: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Checked(Outcome<SyncCheck>),
    Pulled(Outcome<String>),
    Pushed(Outcome<String>),
}

const MERGE_CONFLICT: &str = "merge conflict detected - resolve manually and run 'snap save'";

/// Only consulted on a failed pull; a clean pull may list paths such as `conflict.rs`.
fn mentions_conflict(text: &str) -> bool {
    text.contains("CONFLICT")
}

pub struct SyncFlow;

impl SyncFlow {
    fn push(session: &Session<Self>, set_upstream: bool) -> Step<Self> {
        let mut next = session.goto(SyncState::Pushing);
        next.payload.set_upstream = set_upstream;
        let branch = next.payload.branch.clone();
        Step::run(next, SyncEffect::Push { branch, set_upstream })
    }
}

impl Flow for SyncFlow {
    type State = SyncState;
    type Payload = SyncPayload;
    type Effect = SyncEffect;
    type Outcome = SyncOutcome;

    const NAME: &'static str = "sync";

    fn start(session: &Session<Self>) -> Step<Self> {
        Step::run(session.goto(SyncState::Checking), SyncEffect::Check)
    }

    fn on_key(_session: &Session<Self>, _key: Key) -> Option<Step<Self>> {
        None
    }

    fn on_outcome(session: &Session<Self>, outcome: SyncOutcome) -> Step<Self> {
        match (session.state, outcome) {
            (SyncState::Checking, SyncOutcome::Checked(Ok(check))) => {
                if !check.has_remote {
                    return Step::idle(
                        session.fail(Cause::precondition("no remote repository configured")),
                    );
                }
                if check.uncommitted {
                    return Step::idle(session.fail(Cause::precondition(
                        "you have uncommitted changes - run 'snap save' first",
                    )));
                }
                let mut next = session.clone();
                next.payload.branch = check.branch;
                if check.has_upstream {
                    Step::run(next.goto(SyncState::Pulling), SyncEffect::Pull)
                } else if session.payload.pull_only {
                    Step::idle(next.fail(Cause::precondition(format!(
                        "branch '{}' has no upstream to pull from",
                        next.payload.branch
                    ))))
                } else {
                    Self::push(&next, true)
                }
            }
            (SyncState::Pulling, SyncOutcome::Pulled(Ok(output))) => {
                let mut next = session.clone();
                next.payload.pulled = Some(!output.contains("Already up to date"));
                if session.payload.pull_only {
                    Step::idle(next.goto(SyncState::Done))
                } else {
                    Self::push(&next, false)
                }
            }
            (SyncState::Pulling, SyncOutcome::Pulled(Err(err))) if mentions_conflict(&err.0) => {
                Step::idle(session.fail(Cause::domain(MERGE_CONFLICT)))
            }
            (SyncState::Pushing, SyncOutcome::Pushed(Ok(output))) => {
                let mut next = session.goto(SyncState::Done);
                next.payload.pushed = Some(!output.contains("Everything up-to-date"));
                Step::idle(next)
            }
            (
                _,
                SyncOutcome::Checked(Err(err))
                | SyncOutcome::Pulled(Err(err))
                | SyncOutcome::Pushed(Err(err)),
            ) => Step::idle(session.fail(err.into())),
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        let payload = &session.payload;
        match session.state {
            SyncState::Init | SyncState::Closed => String::new(),
            SyncState::Checking => "Checking repository...".to_string(),
            SyncState::Pulling => format!("Pulling '{}'...", payload.branch),
            SyncState::Pushing => format!("Pushing '{}'...", payload.branch),
            SyncState::Done => {
                let mut parts = Vec::new();
                match payload.pulled {
                    Some(true) => parts.push("pulled".to_string()),
                    Some(false) => parts.push("up to date".to_string()),
                    None => {}
                }
                match payload.pushed {
                    Some(true) if payload.set_upstream => {
                        parts.push(format!("pushed, tracking origin/{}", payload.branch))
                    }
                    Some(true) => parts.push("pushed".to_string()),
                    Some(false) => parts.push("up to date".to_string()),
                    None => {}
                }
                success_line(&format!("Sync complete ({})", parts.join(", ")))
            }
            SyncState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: SyncEffect, _services: &Services) -> SyncOutcome {
        match effect {
            SyncEffect::Check => SyncOutcome::Checked(super::effect(check())),
            SyncEffect::Pull => SyncOutcome::Pulled(super::effect(git::pull())),
            SyncEffect::Push {
                branch,
                set_upstream,
            } => SyncOutcome::Pushed(super::effect(git::push(&branch, set_upstream))),
        }
    }
}

fn check() -> Result<SyncCheck> {
    Ok(SyncCheck {
        has_remote: git::has_remote()?,
        uncommitted: git::has_uncommitted_changes()?,
        branch: git::current_branch()?,
        has_upstream: git::has_upstream(),
    })
}
