//! `snap stack`: browse and filter commit history, check out a commit.

use super::{help_footer, render_failure, window, Outcome, PAGE_SIZE};
use crate::engine::{Flow, FlowState, Key, ListFilter, Services, Session, Step};
use crate::error::{Cause, SnapError};
use crate::git::{self, CommitInfo, HistoryQuery};
use crate::output::{
    title, truncate, visible_width, BOLD, CYAN, GRAY, GREEN, POINTER, RESET, REVERSE, WARN,
    YELLOW,
};

/// Which commits to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackQuery {
    pub limit: usize,
    pub all: bool,
    /// Only the current git user's commits.
    pub mine: bool,
    pub path: Option<String>,
}

impl Default for StackQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            all: false,
            mine: false,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Init,
    Loading,
    Browsing,
    Filtering,
    CheckingOut,
    Done,
    Closed,
    Error,
}

impl FlowState for StackState {
    const INITIAL: Self = StackState::Init;
    const CLOSED: Self = StackState::Closed;
    const FAILED: Self = StackState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, StackState::Done | StackState::Closed | StackState::Error)
    }

    fn is_in_flight(self) -> bool {
        matches!(self, StackState::Loading | StackState::CheckingOut)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackPayload {
    pub query: StackQuery,
    pub list: ListFilter<CommitInfo>,
    pub show_help: bool,
    pub checked_out: Option<CommitInfo>,
}

impl StackPayload {
    pub fn new(query: StackQuery) -> Self {
        Self {
            query,
            list: ListFilter::new(Vec::new()),
            show_help: false,
            checked_out: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StackEffect {
    Load(StackQuery),
    Checkout(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StackOutcome {
    Loaded(Outcome<Vec<CommitInfo>>),
    CheckedOut(Outcome<()>),
}

type Commits = ListFilter<CommitInfo>;

pub struct StackFlow;

impl StackFlow {
    fn with_list(session: &Session<Self>, f: impl FnOnce(Commits) -> Commits) -> Step<Self> {
        let mut next = session.clone();
        next.payload.list = f(session.payload.list.clone());
        Step::idle(next)
    }

    fn checkout(session: &Session<Self>) -> Option<Step<Self>> {
        let commit = session.payload.list.selected()?.clone();
        let mut next = session.goto(StackState::CheckingOut);
        let hash = commit.hash.clone();
        next.payload.checked_out = Some(commit);
        Some(Step::run(next, StackEffect::Checkout(hash)))
    }

    fn on_browsing(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match key {
            k if k.is_up() => Some(Self::with_list(session, Commits::move_up)),
            k if k.is_down() => Some(Self::with_list(session, Commits::move_down)),
            Key::Char('g') | Key::Home => Some(Self::with_list(session, Commits::move_top)),
            Key::Char('G') | Key::End => Some(Self::with_list(session, Commits::move_bottom)),
            Key::Char('/') => {
                let mut next = session.goto(StackState::Filtering);
                next.payload.list = session.payload.list.clone().clear();
                Some(Step::idle(next))
            }
            Key::Char('c') => Some(Self::with_list(session, Commits::clear)),
            Key::Enter => Self::checkout(session),
            Key::Char('?') => {
                let mut next = session.clone();
                next.payload.show_help = !session.payload.show_help;
                Some(Step::idle(next))
            }
            _ => None,
        }
    }

    fn on_filtering(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        let query = session.payload.list.query();
        let step = match key {
            Key::Char(c) if !c.is_control() => {
                let query = format!("{}{}", query, c);
                Self::with_list(session, |list| list.set_query(&query))
            }
            Key::Backspace => {
                let mut query = query.to_string();
                query.pop();
                Self::with_list(session, |list| list.set_query(&query))
            }
            Key::Up => Self::with_list(session, Commits::move_up),
            Key::Down => Self::with_list(session, Commits::move_down),
            Key::Enter => Step::idle(session.goto(StackState::Browsing)),
            Key::Esc | Key::CtrlC => {
                let mut step = Self::with_list(session, Commits::clear);
                step.session.state = StackState::Browsing;
                step
            }
            _ => return None,
        };
        Some(step)
    }
}

impl Flow for StackFlow {
    type State = StackState;
    type Payload = StackPayload;
    type Effect = StackEffect;
    type Outcome = StackOutcome;

    const NAME: &'static str = "stack";

    fn start(session: &Session<Self>) -> Step<Self> {
        Step::run(
            session.goto(StackState::Loading),
            StackEffect::Load(session.payload.query.clone()),
        )
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match session.state {
            StackState::Browsing => Self::on_browsing(session, key),
            StackState::Filtering => Self::on_filtering(session, key),
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: StackOutcome) -> Step<Self> {
        match (session.state, outcome) {
            (StackState::Loading, StackOutcome::Loaded(Ok(commits))) => {
                if commits.is_empty() {
                    return Step::idle(session.fail(Cause::domain("no commits found")));
                }
                let mut next = session.goto(StackState::Browsing);
                next.payload.list = ListFilter::new(commits);
                Step::idle(next)
            }
            (StackState::CheckingOut, StackOutcome::CheckedOut(Ok(()))) => {
                Step::idle(session.goto(StackState::Done))
            }
            (_, StackOutcome::Loaded(Err(err)) | StackOutcome::CheckedOut(Err(err))) => {
                Step::idle(session.fail(err.into()))
            }
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        match session.state {
            StackState::Init | StackState::Closed => String::new(),
            StackState::Loading => "Loading history...".to_string(),
            StackState::Browsing | StackState::Filtering => render_list(session),
            StackState::CheckingOut => match &session.payload.checked_out {
                Some(commit) => format!("Checking out {}...", commit.short_hash),
                None => "Checking out...".to_string(),
            },
            StackState::Done => {
                let (short, message) = session
                    .payload
                    .checked_out
                    .as_ref()
                    .map(|c| (c.short_hash.as_str(), c.message.as_str()))
                    .unwrap_or_default();
                format!(
                    "{GREEN}{BOLD}✓ Checked out {short}{RESET} {message}\n\n\
                     {YELLOW}{WARN} You are in 'detached HEAD' state.{RESET}\n\
                     Look around and make experimental commits; they belong to no branch.\n\n\
                     To get back to a branch:\n  {CYAN}snap branch switch <branch-name>{RESET}\n\
                     To keep work made here:\n  {CYAN}snap branch new <branch-name>{RESET}\n"
                )
            }
            StackState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: StackEffect, _services: &Services) -> StackOutcome {
        match effect {
            StackEffect::Load(query) => StackOutcome::Loaded(super::effect(load(&query))),
            StackEffect::Checkout(hash) => {
                StackOutcome::CheckedOut(super::effect(git::checkout_commit(&hash)))
            }
        }
    }
}

fn load(query: &StackQuery) -> crate::error::Result<Vec<CommitInfo>> {
    let author = if query.mine {
        let name = git::user_name()?;
        if name.is_empty() {
            return Err(SnapError::GitError(
                "git user.name is not set; cannot filter by author".to_string(),
            ));
        }
        Some(name)
    } else {
        None
    };
    git::commit_history(&HistoryQuery {
        limit: query.limit,
        all_branches: query.all,
        author,
        path: query.path.clone(),
    })
}

fn render_list(session: &Session<StackFlow>) -> String {
    let payload = &session.payload;
    let list = &payload.list;
    let mut heading = format!("History ({} commits)", list.master().len());
    if list.is_filtered() {
        heading = format!("History ({} of {} commits)", list.len(), list.master().len());
    }
    let mut out = format!("\n{}\n", title(&heading));

    if session.state == StackState::Filtering {
        out.push_str(&format!("{CYAN}/{RESET}{}{REVERSE} {RESET}\n", list.query()));
    } else if list.is_filtered() {
        out.push_str(&format!("{GRAY}filter: {}{RESET}\n", list.query()));
    }
    out.push('\n');

    if list.is_empty() {
        out.push_str(&format!("  {GRAY}no matching commits{RESET}\n"));
    }
    let commits: Vec<&CommitInfo> = list.displayed().collect();
    let width = usize::from(session.width);
    for idx in window(commits.len(), list.cursor(), PAGE_SIZE) {
        let commit = commits[idx];
        let pointer = if idx == list.cursor() {
            format!("{CYAN}{POINTER}{RESET}")
        } else {
            " ".to_string()
        };
        let meta = format!("{} · {}", commit.author, commit.date);
        let room = width.saturating_sub(visible_width(&meta) + commit.short_hash.len() + 8);
        out.push_str(&format!(
            "{} {YELLOW}{}{RESET} {} {GRAY}{}{RESET}\n",
            pointer,
            commit.short_hash,
            truncate(&commit.message, room.max(10)),
            meta
        ));
    }
    out.push('\n');
    if session.state == StackState::Filtering {
        out.push_str(&crate::output::key_hints(&[
            ("enter", "keep filter"),
            ("esc", "clear"),
            ("↑/↓", "move"),
        ]));
    } else {
        out.push_str(&help_footer(
            payload.show_help,
            &[
                ("↑/k ↓/j", "move"),
                ("g/G", "top/bottom"),
                ("/", "filter"),
                ("c", "clear filter"),
                ("enter", "checkout"),
                ("q", "quit"),
            ],
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EffectError;
    use crate::flows::testing::{complete, press, start};
    use crate::test_utils::TestRepo;

    fn commit(hash: &str, author: &str, message: &str) -> CommitInfo {
        CommitInfo {
            hash: hash.to_string(),
            short_hash: hash[..7].to_string(),
            author: author.to_string(),
            date: "2 days ago".to_string(),
            message: message.to_string(),
        }
    }

    fn browsing() -> Session<StackFlow> {
        let step = start::<StackFlow>(StackPayload::new(StackQuery::default()));
        complete(
            &step.session,
            StackOutcome::Loaded(Ok(vec![
                commit("aaaaaaa111", "Ann", "feat: add login"),
                commit("bbbbbbb222", "Bob", "fix: crash on start"),
                commit("ccccccc333", "Ann", "docs: login guide"),
            ])),
        )
        .session
    }

    #[test]
    fn test_start_loads_with_query() {
        let query = StackQuery {
            limit: 5,
            all: true,
            mine: true,
            path: Some("src".to_string()),
        };
        let step = start::<StackFlow>(StackPayload::new(query.clone()));
        assert_eq!(step.session.state, StackState::Loading);
        assert_eq!(step.effect, Some(StackEffect::Load(query)));
    }

    #[test]
    fn test_no_commits_is_domain_failure() {
        let step = start::<StackFlow>(StackPayload::new(StackQuery::default()));
        let step = complete(&step.session, StackOutcome::Loaded(Ok(vec![])));
        assert_eq!(step.session.last_error, Some(Cause::domain("no commits found")));
    }

    #[test]
    fn test_navigation() {
        let session = browsing();
        assert_eq!(press(&session, &["j", "down"]).session.payload.list.cursor(), 2);
        assert_eq!(press(&session, &["G"]).session.payload.list.cursor(), 2);
        assert_eq!(press(&session, &["G", "g"]).session.payload.list.cursor(), 0);
        assert_eq!(press(&session, &["up"]).session.payload.list.cursor(), 0);
    }

    #[test]
    fn test_filter_then_checkout() {
        let step = press(&browsing(), &["/", "l", "o", "g", "i", "n"]);
        assert_eq!(step.session.state, StackState::Filtering);
        assert_eq!(step.session.payload.list.len(), 2);

        let step = press(&step.session, &["down", "enter"]);
        assert_eq!(step.session.state, StackState::Browsing);
        assert_eq!(step.session.payload.list.query(), "login");

        let step = press(&step.session, &["enter"]);
        assert_eq!(step.session.state, StackState::CheckingOut);
        assert_eq!(step.effect, Some(StackEffect::Checkout("ccccccc333".to_string())));

        let step = complete(&step.session, StackOutcome::CheckedOut(Ok(())));
        assert_eq!(step.session.state, StackState::Done);
        let render = StackFlow::render(&step.session);
        assert!(render.contains("detached HEAD"));
        assert!(render.contains("snap branch switch <branch-name>"));
    }

    #[test]
    fn test_filter_keys_are_text_not_commands() {
        let step = press(&browsing(), &["/", "q", "j", "k"]);
        assert_eq!(step.session.state, StackState::Filtering);
        assert_eq!(step.session.payload.list.query(), "qjk");
    }

    #[test]
    fn test_backspace_widens_and_escape_clears() {
        let step = press(&browsing(), &["/", "b", "o", "b"]);
        assert_eq!(step.session.payload.list.len(), 1);
        let step = press(&step.session, &["backspace", "backspace", "backspace"]);
        assert_eq!(step.session.payload.list.len(), 3);

        let step = press(&browsing(), &["/", "f", "i", "x", "esc"]);
        assert_eq!(step.session.state, StackState::Browsing);
        assert!(!step.session.payload.list.is_filtered());
        assert_eq!(step.session.payload.list.len(), 3);
    }

    #[test]
    fn test_clear_filter_from_browsing() {
        let step = press(&browsing(), &["/", "d", "o", "c", "s", "enter", "c"]);
        assert_eq!(step.session.state, StackState::Browsing);
        assert_eq!(step.session.payload.list.len(), 3);
    }

    #[test]
    fn test_reentering_filter_starts_empty() {
        let step = press(&browsing(), &["/", "l", "o", "g", "i", "n", "enter"]);
        assert_eq!(step.session.payload.list.len(), 2);
        let step = press(&step.session, &["/"]);
        assert_eq!(step.session.state, StackState::Filtering);
        assert_eq!(step.session.payload.list.query(), "");
        assert_eq!(step.session.payload.list.len(), 3);
        let step = press(&step.session, &["f", "i", "x"]);
        assert_eq!(step.session.payload.list.query(), "fix");
    }

    #[test]
    fn test_enter_with_no_match_is_ignored() {
        let step = press(&browsing(), &["/", "z", "z", "z", "enter"]);
        assert!(step.session.payload.list.is_empty());
        let after = press(&step.session, &["enter"]);
        assert_eq!(after.session, step.session);
        assert!(after.effect.is_none());
        assert!(StackFlow::render(&step.session).contains("no matching commits"));
    }

    #[test]
    fn test_checkout_failure() {
        let step = press(&browsing(), &["enter"]);
        let step = complete(
            &step.session,
            StackOutcome::CheckedOut(Err(EffectError::from("would be overwritten by checkout"))),
        );
        assert_eq!(step.session.state, StackState::Error);
        assert!(StackFlow::render(&step.session).contains("would be overwritten"));
    }

    #[test]
    fn test_render_lists_commits_and_help() {
        let session = browsing();
        let render = StackFlow::render(&session);
        assert!(render.contains("History (3 commits)"));
        assert!(render.contains("feat: add login"));
        assert!(render.contains("Press ? for help"));
        let render = StackFlow::render(&press(&session, &["?"]).session);
        assert!(render.contains("checkout"));
    }

    #[test]
    fn test_load_filters_by_current_user() {
        let repo = TestRepo::new();
        repo.git(&["config", "user.name", "Other Person"]);
        repo.commit_file("other.txt", "x", "feat: someone else");
        repo.git(&["config", "user.name", "Test User"]);
        repo.commit_file("mine.txt", "y", "feat: mine");

        let all = load(&StackQuery::default()).unwrap();
        assert_eq!(all.len(), 3);

        let mine = load(&StackQuery {
            mine: true,
            ..StackQuery::default()
        })
        .unwrap();
        assert!(mine.iter().all(|c| c.author == "Test User"));
        assert_eq!(mine.len(), 2);

        let by_path = load(&StackQuery {
            path: Some("other.txt".to_string()),
            ..StackQuery::default()
        })
        .unwrap();
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].message, "feat: someone else");
    }
}
