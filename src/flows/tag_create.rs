//! `snap tags create <name>`: preview the release, then create and push an
//! annotated tag. A failed push removes the local tag again.

use super::tag_diff::{commit_row, load_release_changes, summary_line, ReleaseChanges};
use super::{help_footer, render_failure, window, Outcome, PAGE_SIZE};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step};
use crate::error::{Cause, EffectError, Result};
use crate::git;
use crate::output::{success_line, title, BLUE, BOLD, RESET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCreateState {
    Init,
    Loading,
    Preview,
    Creating,
    Pushing,
    RollingBack,
    Done,
    Closed,
    Error,
}

impl FlowState for TagCreateState {
    const INITIAL: Self = TagCreateState::Init;
    const CLOSED: Self = TagCreateState::Closed;
    const FAILED: Self = TagCreateState::Error;

    fn is_terminal(self) -> bool {
        matches!(
            self,
            TagCreateState::Done | TagCreateState::Closed | TagCreateState::Error
        )
    }

    fn is_in_flight(self) -> bool {
        matches!(
            self,
            TagCreateState::Loading
                | TagCreateState::Creating
                | TagCreateState::Pushing
                | TagCreateState::RollingBack
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagCreatePayload {
    pub tag: String,
    pub changes: ReleaseChanges,
    pub cursor: usize,
    pub show_help: bool,
    /// Web page of the pushed tag.
    pub url: Option<String>,
    /// Why the push failed, kept while the local tag is removed.
    pub push_error: String,
}

impl TagCreatePayload {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().trim().to_string(),
            changes: ReleaseChanges::default(),
            cursor: 0,
            show_help: true,
            url: None,
            push_error: String::new(),
        }
    }
}

/// What the preview needs to know before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct TagPlan {
    pub exists: bool,
    pub changes: ReleaseChanges,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagCreateEffect {
    Load { tag: String },
    Create { tag: String, message: String },
    Push { tag: String },
    DeleteTag { tag: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagCreateOutcome {
    Loaded(Outcome<TagPlan>),
    Created(Outcome<()>),
    Pushed(Outcome<Option<String>>),
    RolledBack(Outcome<()>),
}

/// Annotated tag message: a release line and one bullet per commit.
pub fn tag_message(tag: &str, changes: &ReleaseChanges) -> String {
    let mut message = format!("Release {}\n\n", tag);
    match &changes.previous_tag {
        Some(previous) => message.push_str(&format!("Changes since {}:\n\n", previous)),
        None => message.push_str("Changes:\n\n"),
    }
    for entry in &changes.commits {
        message.push_str(&format!("- {}\n", entry.commit.message));
    }
    message
}

pub struct TagCreateFlow;

impl TagCreateFlow {
    fn on_preview(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        let payload = &session.payload;
        let last = payload.changes.commits.len().saturating_sub(1);
        let mut next = session.clone();
        match key {
            Key::Char('y') | Key::Char('Y') | Key::Enter => {
                return Some(Step::run(
                    session.goto(TagCreateState::Creating),
                    TagCreateEffect::Create {
                        tag: payload.tag.clone(),
                        message: tag_message(&payload.tag, &payload.changes),
                    },
                ));
            }
            Key::Char('n') | Key::Char('N') | Key::Char('q') | Key::CtrlC => {
                return Some(Step::idle(session.fail(Cause::cancelled("tag creation"))));
            }
            k if k.is_up() => next.payload.cursor = payload.cursor.saturating_sub(1),
            k if k.is_down() => next.payload.cursor = (payload.cursor + 1).min(last),
            Key::Char('?') => next.payload.show_help = !payload.show_help,
            _ => return None,
        }
        Some(Step::idle(next))
    }
}

impl Flow for TagCreateFlow {
    type State = TagCreateState;
    type Payload = TagCreatePayload;
    type Effect = TagCreateEffect;
    type Outcome = TagCreateOutcome;

    const NAME: &'static str = "tag-create";

    fn start(session: &Session<Self>) -> Step<Self> {
        if session.payload.tag.is_empty() {
            return Step::idle(session.fail(Cause::precondition("tag name cannot be empty")));
        }
        Step::run(
            session.goto(TagCreateState::Loading),
            TagCreateEffect::Load {
                tag: session.payload.tag.clone(),
            },
        )
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match session.state {
            TagCreateState::Preview => Self::on_preview(session, key),
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: TagCreateOutcome) -> Step<Self> {
        let tag = &session.payload.tag;
        match (session.state, outcome) {
            (TagCreateState::Loading, TagCreateOutcome::Loaded(Ok(plan))) => {
                if plan.exists {
                    return Step::idle(session.fail(Cause::precondition(format!(
                        "tag '{}' already exists",
                        tag
                    ))));
                }
                if plan.changes.commits.is_empty() {
                    return Step::idle(session.fail(Cause::domain(format!(
                        "no commits since {}",
                        plan.changes.since()
                    ))));
                }
                let mut next = session.goto(TagCreateState::Preview);
                next.payload.changes = plan.changes;
                Step::idle(next)
            }
            (TagCreateState::Creating, TagCreateOutcome::Created(Ok(()))) => Step::run(
                session.goto(TagCreateState::Pushing),
                TagCreateEffect::Push { tag: tag.clone() },
            ),
            (TagCreateState::Pushing, TagCreateOutcome::Pushed(Ok(url))) => {
                let mut next = session.goto(TagCreateState::Done);
                next.payload.url = url;
                Step::idle(next)
            }
            (TagCreateState::Pushing, TagCreateOutcome::Pushed(Err(err))) => {
                tracing::warn!(tag = %tag, error = %err, "push failed, removing local tag");
                let mut next = session.goto(TagCreateState::RollingBack);
                next.payload.push_error = err.0;
                Step::run(next, TagCreateEffect::DeleteTag { tag: tag.clone() })
            }
            (TagCreateState::RollingBack, TagCreateOutcome::RolledBack(result)) => {
                let mut message = format!("failed to push tag: {}", session.payload.push_error);
                if let Err(err) = result {
                    message.push_str(&format!(
                        " (the local tag could not be removed: {})",
                        err
                    ));
                }
                Step::idle(session.fail(EffectError(message).into()))
            }
            (_, TagCreateOutcome::Loaded(Err(err)) | TagCreateOutcome::Created(Err(err))) => {
                Step::idle(session.fail(err.into()))
            }
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        let payload = &session.payload;
        match session.state {
            TagCreateState::Init | TagCreateState::Closed => String::new(),
            TagCreateState::Loading => "Collecting changes since the latest tag...".to_string(),
            TagCreateState::Preview => {
                let changes = &payload.changes;
                let mut out = format!(
                    "\n{}\n\n",
                    title(&format!("Create tag {} (since {})", payload.tag, changes.since()))
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
                    &[("y/enter", "create and push"), ("n", "cancel"), ("↑/↓", "scroll")],
                ));
                out
            }
            TagCreateState::Creating => format!("Creating tag {}...", payload.tag),
            TagCreateState::Pushing => format!("Pushing tag {}...", payload.tag),
            TagCreateState::RollingBack => {
                format!("Push failed, removing local tag {}...", payload.tag)
            }
            TagCreateState::Done => {
                let mut out = success_line(&format!("Created and pushed tag {}", payload.tag));
                if let Some(url) = &payload.url {
                    out.push_str(&format!("  {BOLD}Release page:{RESET} {BLUE}{}{RESET}\n", url));
                }
                out
            }
            TagCreateState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: TagCreateEffect, _services: &Services) -> TagCreateOutcome {
        match effect {
            TagCreateEffect::Load { tag } => TagCreateOutcome::Loaded(super::effect(plan(&tag))),
            TagCreateEffect::Create { tag, message } => TagCreateOutcome::Created(super::effect(
                git::create_annotated_tag(&tag, &message),
            )),
            TagCreateEffect::Push { tag } => {
                TagCreateOutcome::Pushed(super::effect(push(&tag, git::tag_url)))
            }
            TagCreateEffect::DeleteTag { tag } => {
                TagCreateOutcome::RolledBack(super::effect(git::delete_tag(&tag)))
            }
        }
    }
}

/// Push `tag`, then look up its web page. Only the push decides success.
fn push(tag: &str, url_for: impl Fn(&str) -> Result<Option<String>>) -> Result<Option<String>> {
    git::push_tag(tag)?;
    Ok(url_for(tag).ok().flatten())
}

fn plan(tag: &str) -> Result<TagPlan> {
    if git::tag_exists(tag) {
        return Ok(TagPlan {
            exists: true,
            changes: ReleaseChanges::default(),
        });
    }
    Ok(TagPlan {
        exists: false,
        changes: load_release_changes()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::tag_diff::CommitWithStats;
    use crate::flows::testing::{complete, press, start};
    use crate::git::{CommitInfo, DiffStats};
    use crate::error::SnapError;
    use crate::test_utils::TestRepo;

    fn changes(previous: Option<&str>) -> ReleaseChanges {
        let entry = |message: &str| CommitWithStats {
            commit: CommitInfo {
                hash: "f".repeat(40),
                short_hash: "fffffff".to_string(),
                author: "Ann".to_string(),
                date: "now".to_string(),
                message: message.to_string(),
            },
            stats: DiffStats::default(),
        };
        ReleaseChanges {
            previous_tag: previous.map(str::to_string),
            commits: vec![entry("feat: b"), entry("fix: a")],
        }
    }

    fn preview() -> Session<TagCreateFlow> {
        let step = start::<TagCreateFlow>(TagCreatePayload::new("v1.1.0"));
        complete(
            &step.session,
            TagCreateOutcome::Loaded(Ok(TagPlan {
                exists: false,
                changes: changes(Some("v1.0.0")),
            })),
        )
        .session
    }

    #[test]
    fn test_tag_message() {
        assert_eq!(
            tag_message("v1.1.0", &changes(Some("v1.0.0"))),
            "Release v1.1.0\n\nChanges since v1.0.0:\n\n- feat: b\n- fix: a\n"
        );
        assert_eq!(
            tag_message("v0.1.0", &changes(None)),
            "Release v0.1.0\n\nChanges:\n\n- feat: b\n- fix: a\n"
        );
    }

    #[test]
    fn test_existing_tag_is_precondition() {
        let step = start::<TagCreateFlow>(TagCreatePayload::new("v1.0.0"));
        let step = complete(
            &step.session,
            TagCreateOutcome::Loaded(Ok(TagPlan {
                exists: true,
                changes: ReleaseChanges::default(),
            })),
        );
        assert_eq!(
            step.session.last_error,
            Some(Cause::precondition("tag 'v1.0.0' already exists"))
        );
    }

    #[test]
    fn test_empty_name_fails_without_effect() {
        let step = start::<TagCreateFlow>(TagCreatePayload::new("  "));
        assert_eq!(step.session.state, TagCreateState::Error);
        assert!(step.effect.is_none());
    }

    #[test]
    fn test_accept_creates_then_pushes() {
        let session = preview();
        assert!(session.payload.show_help);
        let step = press(&session, &["enter"]);
        assert_eq!(step.session.state, TagCreateState::Creating);
        assert_eq!(
            step.effect,
            Some(TagCreateEffect::Create {
                tag: "v1.1.0".to_string(),
                message: tag_message("v1.1.0", &changes(Some("v1.0.0"))),
            })
        );
        let step = complete(&step.session, TagCreateOutcome::Created(Ok(())));
        assert_eq!(
            step.effect,
            Some(TagCreateEffect::Push {
                tag: "v1.1.0".to_string()
            })
        );
        let url = "https://github.com/u/r/releases/tag/v1.1.0".to_string();
        let step = complete(&step.session, TagCreateOutcome::Pushed(Ok(Some(url.clone()))));
        assert_eq!(step.session.state, TagCreateState::Done);
        let render = TagCreateFlow::render(&step.session);
        assert!(render.contains("Created and pushed tag v1.1.0"));
        assert!(render.contains(&url));
    }

    #[test]
    fn test_decline_cancels() {
        for key in ["n", "N", "q", "ctrl+c"] {
            let step = press(&preview(), &[key]);
            assert_eq!(step.session.last_error, Some(Cause::cancelled("tag creation")));
            assert!(step.effect.is_none());
        }
    }

    #[test]
    fn test_push_failure_rolls_back_local_tag() {
        let step = press(&preview(), &["y"]);
        let step = complete(&step.session, TagCreateOutcome::Created(Ok(())));
        let step = complete(
            &step.session,
            TagCreateOutcome::Pushed(Err(EffectError::from("remote rejected"))),
        );
        assert_eq!(step.session.state, TagCreateState::RollingBack);
        assert_eq!(
            step.effect,
            Some(TagCreateEffect::DeleteTag {
                tag: "v1.1.0".to_string()
            })
        );

        let done = complete(&step.session, TagCreateOutcome::RolledBack(Ok(())));
        assert_eq!(done.session.state, TagCreateState::Error);
        assert_eq!(
            done.session.last_error,
            Some(Cause::Effect("failed to push tag: remote rejected".to_string()))
        );

        let worse = complete(
            &step.session,
            TagCreateOutcome::RolledBack(Err(EffectError::from("locked"))),
        );
        assert!(matches!(
            worse.session.last_error,
            Some(Cause::Effect(ref m)) if m.contains("remote rejected") && m.contains("locked")
        ));
    }

    #[test]
    fn test_quit_while_pushing_closes() {
        let step = press(&preview(), &["y"]);
        let step = complete(&step.session, TagCreateOutcome::Created(Ok(())));
        let step = press(&step.session, &["ctrl+c"]);
        assert_eq!(step.session.state, TagCreateState::Closed);
        assert!(step.session.last_error.is_none());
    }

    #[test]
    fn test_plan_against_repository() {
        let repo = TestRepo::new();
        repo.git(&["tag", "-a", "v1.0.0", "-m", "First"]);
        repo.commit_file("x.txt", "x\n", "feat: x");

        let existing = plan("v1.0.0").unwrap();
        assert!(existing.exists);

        let fresh = plan("v1.1.0").unwrap();
        assert!(!fresh.exists);
        assert_eq!(fresh.changes.previous_tag.as_deref(), Some("v1.0.0"));
        assert_eq!(fresh.changes.commits.len(), 1);
    }

    #[test]
    fn test_push_succeeds_even_when_url_lookup_fails() {
        let repo = TestRepo::new();
        let remote = tempfile::TempDir::new().unwrap();
        let remote_path = remote.path().to_str().unwrap();
        repo.git(&["init", "--bare", "--quiet", remote_path]);
        repo.git(&["remote", "add", "origin", remote_path]);
        repo.git(&["tag", "-a", "v1.0.0", "-m", "First"]);

        let failing_lookup =
            |_: &str| -> Result<Option<String>> { Err(SnapError::GitError("no url".into())) };
        assert_eq!(push("v1.0.0", failing_lookup).unwrap(), None);
        let url = |tag: &str| -> Result<Option<String>> {
            Ok(Some(format!("https://example.com/{}", tag)))
        };
        assert_eq!(
            push("v1.0.0", url).unwrap().as_deref(),
            Some("https://example.com/v1.0.0")
        );
        assert!(push("v9.9.9", url).is_err());
    }
}
