//! `snap branch`: list, create, switch and delete local branches.

use super::{help_footer, render_failure, window, Outcome, PAGE_SIZE};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step, TextInput};
use crate::error::Cause;
use crate::git::{self, BranchInfo};
use crate::output::{
    key_hints, success_line, title, truncate, BOLD, CYAN, GRAY, GREEN, POINTER, RESET,
};

const NAME_LIMIT: usize = 100;

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchCommand {
    /// Interactive browser.
    List,
    /// Create and switch; prompt for the name when absent.
    Create(Option<String>),
    Switch(String),
    Delete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    Init,
    Loading,
    Browsing,
    Naming,
    Creating,
    Switching,
    Deleting,
    Done,
    Closed,
    Error,
}

impl FlowState for BranchState {
    const INITIAL: Self = BranchState::Init;
    const CLOSED: Self = BranchState::Closed;
    const FAILED: Self = BranchState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, BranchState::Done | BranchState::Closed | BranchState::Error)
    }

    fn is_in_flight(self) -> bool {
        matches!(
            self,
            BranchState::Loading
                | BranchState::Creating
                | BranchState::Switching
                | BranchState::Deleting
        )
    }
}

/// What the finished session did, for the final message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    Created,
    Switched,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchPayload {
    pub command: BranchCommand,
    pub branches: Vec<BranchInfo>,
    pub cursor: usize,
    pub show_help: bool,
    pub input: TextInput,
    /// Branch the running or finished operation applies to.
    pub target: String,
    pub action: Option<BranchAction>,
    /// Naming was entered from the browser, so Esc goes back to it.
    pub from_list: bool,
}

impl BranchPayload {
    pub fn new(command: BranchCommand) -> Self {
        Self {
            command,
            branches: Vec::new(),
            cursor: 0,
            show_help: false,
            input: TextInput::new(NAME_LIMIT),
            target: String::new(),
            action: None,
            from_list: false,
        }
    }

    fn current(&self) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.is_current)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchEffect {
    LoadBranches,
    CreateAndSwitch(String),
    Switch(String),
    Delete(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    Loaded(Outcome<Vec<BranchInfo>>),
    Created(Outcome<()>),
    Switched(Outcome<()>),
    Deleted(Outcome<()>),
}

pub struct BranchFlow;

impl BranchFlow {
    fn create(session: &Session<Self>, name: &str) -> Step<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Step::idle(session.fail(Cause::precondition("branch name cannot be empty")));
        }
        let mut next = session.goto(BranchState::Creating);
        next.payload.target = name.to_string();
        Step::run(next, BranchEffect::CreateAndSwitch(name.to_string()))
    }

    fn switch(session: &Session<Self>, name: &str) -> Step<Self> {
        let payload = &session.payload;
        if payload.current().is_some_and(|b| b.name == name) {
            return Step::idle(
                session.fail(Cause::precondition(format!("already on branch '{}'", name))),
            );
        }
        if !payload.branches.iter().any(|b| b.name == name) {
            return Step::idle(
                session.fail(Cause::precondition(format!("branch '{}' not found", name))),
            );
        }
        let mut next = session.goto(BranchState::Switching);
        next.payload.target = name.to_string();
        Step::run(next, BranchEffect::Switch(name.to_string()))
    }

    fn delete(session: &Session<Self>, name: &str) -> Step<Self> {
        let payload = &session.payload;
        if payload.current().is_some_and(|b| b.name == name) {
            return Step::idle(session.fail(Cause::precondition("cannot delete current branch")));
        }
        if !payload.branches.iter().any(|b| b.name == name) {
            return Step::idle(
                session.fail(Cause::precondition(format!("branch '{}' not found", name))),
            );
        }
        let mut next = session.goto(BranchState::Deleting);
        next.payload.target = name.to_string();
        Step::run(next, BranchEffect::Delete(name.to_string()))
    }

    fn finished(session: &Session<Self>, action: BranchAction) -> Step<Self> {
        let mut next = session.goto(BranchState::Done);
        next.payload.action = Some(action);
        Step::idle(next)
    }

    fn on_browsing(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        let payload = &session.payload;
        let mut next = session.clone();
        match key {
            k if k.is_up() => next.payload.cursor = payload.cursor.saturating_sub(1),
            k if k.is_down() => {
                if payload.cursor + 1 < payload.branches.len() {
                    next.payload.cursor += 1;
                }
            }
            Key::Enter => {
                let branch = payload.branches.get(payload.cursor)?;
                if branch.is_current {
                    return None;
                }
                return Some(Self::switch(session, &branch.name));
            }
            Key::Char('n') => {
                next.state = BranchState::Naming;
                next.payload.input = TextInput::new(NAME_LIMIT);
                next.payload.from_list = true;
            }
            Key::Char('d') => {
                let branch = payload.branches.get(payload.cursor)?;
                return Some(Self::delete(session, &branch.name));
            }
            Key::Char('?') => next.payload.show_help = !payload.show_help,
            _ => return None,
        }
        Some(Step::idle(next))
    }

    fn on_naming(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match key {
            Key::Enter => Some(Self::create(session, &session.payload.input.value())),
            Key::Esc | Key::CtrlC => {
                if session.payload.from_list {
                    Some(Step::idle(session.goto(BranchState::Browsing)))
                } else {
                    Some(Step::idle(session.close()))
                }
            }
            // Branch names cannot contain spaces.
            Key::Char(' ') => Some(Step::idle(session.clone())),
            key => {
                let mut next = session.clone();
                next.payload.input.apply(key).then(|| Step::idle(next))
            }
        }
    }
}

impl Flow for BranchFlow {
    type State = BranchState;
    type Payload = BranchPayload;
    type Effect = BranchEffect;
    type Outcome = BranchOutcome;

    const NAME: &'static str = "branch";

    fn start(session: &Session<Self>) -> Step<Self> {
        match &session.payload.command {
            BranchCommand::Create(Some(name)) => Self::create(session, name),
            BranchCommand::Create(None) => Step::idle(session.goto(BranchState::Naming)),
            BranchCommand::List | BranchCommand::Switch(_) | BranchCommand::Delete(_) => {
                Step::run(session.goto(BranchState::Loading), BranchEffect::LoadBranches)
            }
        }
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match session.state {
            BranchState::Browsing => Self::on_browsing(session, key),
            BranchState::Naming => Self::on_naming(session, key),
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: BranchOutcome) -> Step<Self> {
        match (session.state, outcome) {
            (BranchState::Loading, BranchOutcome::Loaded(Ok(branches))) => {
                let mut next = session.clone();
                next.payload.cursor = branches.iter().position(|b| b.is_current).unwrap_or(0);
                next.payload.branches = branches;
                match &session.payload.command {
                    BranchCommand::Switch(name) => Self::switch(&next, name),
                    BranchCommand::Delete(name) => Self::delete(&next, name),
                    _ => Step::idle(next.goto(BranchState::Browsing)),
                }
            }
            (BranchState::Creating, BranchOutcome::Created(Ok(()))) => {
                Self::finished(session, BranchAction::Created)
            }
            (BranchState::Switching, BranchOutcome::Switched(Ok(()))) => {
                Self::finished(session, BranchAction::Switched)
            }
            (BranchState::Deleting, BranchOutcome::Deleted(Ok(()))) => {
                Self::finished(session, BranchAction::Deleted)
            }
            (
                _,
                BranchOutcome::Loaded(Err(err))
                | BranchOutcome::Created(Err(err))
                | BranchOutcome::Switched(Err(err))
                | BranchOutcome::Deleted(Err(err)),
            ) => Step::idle(session.fail(err.into())),
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        let payload = &session.payload;
        match session.state {
            BranchState::Init | BranchState::Closed => String::new(),
            BranchState::Loading => "Loading branches...".to_string(),
            BranchState::Browsing => render_list(session),
            BranchState::Naming => format!(
                "\n{}\n{}\n\n{}",
                title("New branch name"),
                payload.input.view(),
                key_hints(&[("enter", "create"), ("esc", "cancel")])
            ),
            BranchState::Creating => format!("Creating branch '{}'...", payload.target),
            BranchState::Switching => format!("Switching to '{}'...", payload.target),
            BranchState::Deleting => format!("Deleting '{}'...", payload.target),
            BranchState::Done => match payload.action {
                Some(BranchAction::Created) => success_line(&format!(
                    "Created and switched to branch '{}'",
                    payload.target
                )),
                Some(BranchAction::Switched) => {
                    success_line(&format!("Switched to branch '{}'", payload.target))
                }
                Some(BranchAction::Deleted) => {
                    success_line(&format!("Deleted branch '{}'", payload.target))
                }
                None => String::new(),
            },
            BranchState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: BranchEffect, _services: &Services) -> BranchOutcome {
        match effect {
            BranchEffect::LoadBranches => BranchOutcome::Loaded(super::effect(git::branches())),
            BranchEffect::CreateAndSwitch(name) => {
                BranchOutcome::Created(super::effect(git::create_and_switch_branch(&name)))
            }
            BranchEffect::Switch(name) => {
                BranchOutcome::Switched(super::effect(git::switch_branch(&name)))
            }
            BranchEffect::Delete(name) => {
                BranchOutcome::Deleted(super::effect(git::delete_branch(&name)))
            }
        }
    }
}

fn render_list(session: &Session<BranchFlow>) -> String {
    let payload = &session.payload;
    let mut out = format!("\n{}\n\n", title("Branches"));
    let width = usize::from(session.width).saturating_sub(6).max(20);
    for idx in window(payload.branches.len(), payload.cursor, PAGE_SIZE) {
        let branch = &payload.branches[idx];
        let pointer = if idx == payload.cursor {
            format!("{CYAN}{POINTER}{RESET}")
        } else {
            " ".to_string()
        };
        let marker = if branch.is_current { "*" } else { " " };
        let mut line = branch.name.clone();
        if !branch.upstream.is_empty() {
            line.push_str(&format!(" [{}]", branch.upstream));
        }
        let name = truncate(&line, width);
        let name = if branch.is_current {
            format!("{GREEN}{BOLD}{}{RESET}", name)
        } else {
            name
        };
        out.push_str(&format!("{} {} {}\n", pointer, marker, name));
        let room = width.saturating_sub(4);
        if !branch.last_commit.is_empty() && room > 0 {
            out.push_str(&format!(
                "      {GRAY}{}{RESET}\n",
                truncate(&branch.last_commit, room)
            ));
        }
    }
    out.push('\n');
    out.push_str(&help_footer(
        payload.show_help,
        &[
            ("↑/k", "up"),
            ("↓/j", "down"),
            ("enter", "switch"),
            ("n", "new"),
            ("d", "delete"),
            ("q", "quit"),
        ],
    ));
    out
}
