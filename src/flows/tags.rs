//! `snap tags`: browse tags and inspect one.

use super::{help_footer, render_failure, window, Outcome, PAGE_SIZE};
use crate::engine::{Flow, FlowState, Key, ListFilter, Services, Session, Step};
use crate::error::{Cause, Result};
use crate::git::{self, CommitInfo, DiffStats, TagDetail, TagInfo};
use crate::output::{
    key_hints, title, truncate, visible_width, BLUE, BOLD, CYAN, GRAY, GREEN, POINTER, RED,
    RESET, REVERSE, YELLOW,
};

/// Commits listed in the detail view before eliding the rest.
const DETAIL_COMMITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagsState {
    Init,
    Loading,
    Browsing,
    Filtering,
    LoadingDetail,
    ShowingDetail,
    Closed,
    Error,
}

impl FlowState for TagsState {
    const INITIAL: Self = TagsState::Init;
    const CLOSED: Self = TagsState::Closed;
    const FAILED: Self = TagsState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, TagsState::Closed | TagsState::Error)
    }

    fn is_in_flight(self) -> bool {
        matches!(self, TagsState::Loading | TagsState::LoadingDetail)
    }
}

/// Everything the detail view shows about one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagView {
    pub detail: TagDetail,
    /// Tag before this one, empty for the first tag.
    pub previous: String,
    pub commits: Vec<CommitInfo>,
    pub stats: DiffStats,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagsPayload {
    pub list: ListFilter<TagInfo>,
    pub show_help: bool,
    pub view: Option<TagView>,
}

impl Default for TagsPayload {
    fn default() -> Self {
        Self {
            list: ListFilter::new(Vec::new()),
            show_help: false,
            view: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagsEffect {
    LoadTags,
    LoadDetail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagsOutcome {
    Loaded(Outcome<Vec<TagInfo>>),
    DetailLoaded(Outcome<TagView>),
}

type Tags = ListFilter<TagInfo>;

pub struct TagsFlow;

impl TagsFlow {
    fn with_list(session: &Session<Self>, f: impl FnOnce(Tags) -> Tags) -> Step<Self> {
        let mut next = session.clone();
        next.payload.list = f(session.payload.list.clone());
        Step::idle(next)
    }

    fn on_browsing(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match key {
            k if k.is_up() => Some(Self::with_list(session, Tags::move_up)),
            k if k.is_down() => Some(Self::with_list(session, Tags::move_down)),
            Key::Char('g') | Key::Home => Some(Self::with_list(session, Tags::move_top)),
            Key::Char('G') | Key::End => Some(Self::with_list(session, Tags::move_bottom)),
            Key::Char('/') => {
                let mut next = session.goto(TagsState::Filtering);
                next.payload.list = session.payload.list.clone().clear();
                Some(Step::idle(next))
            }
            Key::Char('c') => Some(Self::with_list(session, Tags::clear)),
            Key::Enter => {
                let tag = session.payload.list.selected()?;
                Some(Step::run(
                    session.goto(TagsState::LoadingDetail),
                    TagsEffect::LoadDetail(tag.name.clone()),
                ))
            }
            Key::Char('?') => {
                let mut next = session.clone();
                next.payload.show_help = !session.payload.show_help;
                Some(Step::idle(next))
            }
            _ => None,
        }
    }

    fn on_filtering(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        let mut query = session.payload.list.query().to_string();
        let step = match key {
            Key::Char(c) if !c.is_control() => {
                query.push(c);
                Self::with_list(session, |list| list.set_query(&query))
            }
            Key::Backspace => {
                query.pop();
                Self::with_list(session, |list| list.set_query(&query))
            }
            Key::Up => Self::with_list(session, Tags::move_up),
            Key::Down => Self::with_list(session, Tags::move_down),
            Key::Enter => Step::idle(session.goto(TagsState::Browsing)),
            Key::Esc | Key::CtrlC => {
                let mut step = Self::with_list(session, Tags::clear);
                step.session.state = TagsState::Browsing;
                step
            }
            _ => return None,
        };
        Some(step)
    }
}

impl Flow for TagsFlow {
    type State = TagsState;
    type Payload = TagsPayload;
    type Effect = TagsEffect;
    type Outcome = TagsOutcome;

    const NAME: &'static str = "tags";

    fn start(session: &Session<Self>) -> Step<Self> {
        Step::run(session.goto(TagsState::Loading), TagsEffect::LoadTags)
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match (session.state, key) {
            (TagsState::Browsing, key) => Self::on_browsing(session, key),
            (TagsState::Filtering, key) => Self::on_filtering(session, key),
            (TagsState::ShowingDetail, Key::Esc | Key::Backspace) => {
                let mut next = session.goto(TagsState::Browsing);
                next.payload.view = None;
                Some(Step::idle(next))
            }
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: TagsOutcome) -> Step<Self> {
        match (session.state, outcome) {
            (TagsState::Loading, TagsOutcome::Loaded(Ok(tags))) => {
                if tags.is_empty() {
                    return Step::idle(session.fail(Cause::domain("no tags found")));
                }
                let mut next = session.goto(TagsState::Browsing);
                next.payload.list = ListFilter::new(tags);
                Step::idle(next)
            }
            (TagsState::LoadingDetail, TagsOutcome::DetailLoaded(Ok(view))) => {
                let mut next = session.goto(TagsState::ShowingDetail);
                next.payload.view = Some(view);
                Step::idle(next)
            }
            (_, TagsOutcome::Loaded(Err(err)) | TagsOutcome::DetailLoaded(Err(err))) => {
                Step::idle(session.fail(err.into()))
            }
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        match session.state {
            TagsState::Init | TagsState::Closed => String::new(),
            TagsState::Loading => "Loading tags...".to_string(),
            TagsState::Browsing | TagsState::Filtering => render_list(session),
            TagsState::LoadingDetail => match session.payload.list.selected() {
                Some(tag) => format!("Loading {}...", tag.name),
                None => "Loading tag...".to_string(),
            },
            TagsState::ShowingDetail => match &session.payload.view {
                Some(view) => render_detail(view, usize::from(session.width)),
                None => String::new(),
            },
            TagsState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: TagsEffect, _services: &Services) -> TagsOutcome {
        match effect {
            TagsEffect::LoadTags => TagsOutcome::Loaded(super::effect(git::tags())),
            TagsEffect::LoadDetail(name) => {
                TagsOutcome::DetailLoaded(super::effect(load_view(&name)))
            }
        }
    }
}

fn load_view(name: &str) -> Result<TagView> {
    let detail = git::tag_detail(name)?;
    let previous = git::previous_tag(name)?;
    let commits = git::commits_between(&previous, name)?;
    let stats = git::range_diff_stats(&previous, name)?;
    let url = git::tag_url(name)?;
    Ok(TagView {
        detail,
        previous,
        commits,
        stats,
        url,
    })
}

fn render_list(session: &Session<TagsFlow>) -> String {
    let list = &session.payload.list;
    let mut out = format!("\n{}\n", title(&format!("Tags ({})", list.master().len())));
    if session.state == TagsState::Filtering {
        out.push_str(&format!("{CYAN}/{RESET}{}{REVERSE} {RESET}\n", list.query()));
    } else if list.is_filtered() {
        out.push_str(&format!("{GRAY}filter: {}{RESET}\n", list.query()));
    }
    out.push('\n');
    if list.is_empty() {
        out.push_str(&format!("  {GRAY}no matching tags{RESET}\n"));
    }

    let tags: Vec<&TagInfo> = list.displayed().collect();
    let name_width = tags.iter().map(|t| visible_width(&t.name)).max().unwrap_or(0);
    let room = usize::from(session.width).saturating_sub(name_width + 30).max(10);
    for idx in window(tags.len(), list.cursor(), PAGE_SIZE) {
        let tag = tags[idx];
        let pointer = if idx == list.cursor() {
            format!("{CYAN}{POINTER}{RESET}")
        } else {
            " ".to_string()
        };
        out.push_str(&format!(
            "{} {GREEN}{BOLD}{}{RESET} {YELLOW}{}{RESET} {} {GRAY}{}{RESET}\n",
            pointer,
            crate::output::pad(&tag.name, name_width),
            tag.short_hash,
            truncate(&tag.message, room),
            tag.date
        ));
    }
    out.push('\n');
    if session.state == TagsState::Filtering {
        out.push_str(&key_hints(&[("enter", "keep filter"), ("esc", "clear")]));
    } else {
        out.push_str(&help_footer(
            session.payload.show_help,
            &[
                ("↑/k ↓/j", "move"),
                ("/", "filter"),
                ("c", "clear filter"),
                ("enter", "details"),
                ("q", "quit"),
            ],
        ));
    }
    out
}

fn render_detail(view: &TagView, width: usize) -> String {
    let detail = &view.detail;
    let mut out = format!("\n{}\n\n", title(&detail.name));
    out.push_str(&format!("  {}\n\n", detail.subject));
    out.push_str(&format!("  {GRAY}Commit:{RESET}   {YELLOW}{}{RESET}\n", detail.short_hash));
    if !detail.tagger_name.is_empty() {
        out.push_str(&format!("  {GRAY}Tagger:{RESET}   {}\n", detail.tagger_name));
    }
    out.push_str(&format!("  {GRAY}Created:{RESET}  {}\n", detail.relative_time));
    let previous = if view.previous.is_empty() {
        "(first tag)"
    } else {
        view.previous.as_str()
    };
    out.push_str(&format!("  {GRAY}Previous:{RESET} {}\n", previous));
    out.push_str(&format!(
        "  {GRAY}Changes:{RESET}  {} files, {GREEN}+{}{RESET} {RED}-{}{RESET}\n",
        view.stats.files, view.stats.additions, view.stats.deletions
    ));
    if let Some(url) = &view.url {
        out.push_str(&format!("  {GRAY}URL:{RESET}      {BLUE}{}{RESET}\n", url));
    }

    out.push_str(&format!("\n  {BOLD}Commits ({}){RESET}\n", view.commits.len()));
    let room = width.saturating_sub(14).max(10);
    for commit in view.commits.iter().take(DETAIL_COMMITS) {
        out.push_str(&format!(
            "    {YELLOW}{}{RESET} {}\n",
            commit.short_hash,
            truncate(&commit.message, room)
        ));
    }
    if view.commits.len() > DETAIL_COMMITS {
        out.push_str(&format!(
            "    {GRAY}... and {} more{RESET}\n",
            view.commits.len() - DETAIL_COMMITS
        ));
    }
    out.push('\n');
    out.push_str(&key_hints(&[("esc", "back"), ("q", "quit")]));
    out
}
