//! `snap save`: stage everything, draft a message, confirm and commit.

use super::{render_failure, Outcome};
use crate::engine::{Flow, FlowState, Key, Services, Session, Step, TextInput};
use crate::error::{Cause, EffectError};
use crate::git;
use crate::output::{key_hints, success_line, title, BOLD, GRAY, MAGENTA, RESET};

/// Maximum length of an edited commit message.
const MESSAGE_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Init,
    Checking,
    Staging,
    Diffing,
    Generating,
    Confirming,
    Editing,
    Committing,
    Done,
    Closed,
    Error,
}

impl FlowState for SaveState {
    const INITIAL: Self = SaveState::Init;
    const CLOSED: Self = SaveState::Closed;
    const FAILED: Self = SaveState::Error;

    fn is_terminal(self) -> bool {
        matches!(self, SaveState::Done | SaveState::Closed | SaveState::Error)
    }

    fn is_in_flight(self) -> bool {
        matches!(
            self,
            SaveState::Checking
                | SaveState::Staging
                | SaveState::Diffing
                | SaveState::Generating
                | SaveState::Committing
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavePayload {
    pub seed: u64,
    /// Message given on the command line; skips generation when set.
    pub custom_message: Option<String>,
    pub diff: String,
    pub message: String,
    /// Message as it was before editing started.
    pub original_message: String,
    pub input: TextInput,
}

impl SavePayload {
    pub fn new(seed: u64, custom_message: Option<String>) -> Self {
        Self {
            seed,
            custom_message: custom_message.filter(|m| !m.trim().is_empty()),
            diff: String::new(),
            message: String::new(),
            original_message: String::new(),
            input: TextInput::new(MESSAGE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveEffect {
    CheckGenerator,
    StageAll,
    GetDiff,
    Generate { diff: String, seed: u64 },
    Commit { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    GeneratorChecked(bool),
    Staged(Outcome<()>),
    Diff(Outcome<String>),
    Generated(Outcome<String>),
    Committed(Outcome<()>),
}

/// `type: description` with both parts non-empty.
pub fn is_conventional(message: &str) -> bool {
    match message.split_once(':') {
        Some((kind, description)) => !kind.trim().is_empty() && !description.trim().is_empty(),
        None => false,
    }
}

pub struct SaveFlow;

impl SaveFlow {
    fn commit(session: &Session<Self>, message: String) -> Step<Self> {
        let mut next = session.goto(SaveState::Committing);
        next.payload.message = message.clone();
        Step::run(next, SaveEffect::Commit { message })
    }

    fn on_confirming(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match key {
            Key::Char('y') | Key::Char('Y') => {
                Some(Self::commit(session, session.payload.message.clone()))
            }
            Key::Char('n') | Key::Char('N') | Key::Char('q') | Key::CtrlC => {
                Some(Step::idle(session.fail(Cause::cancelled("commit"))))
            }
            Key::Char('e') | Key::Char('E') => {
                let mut next = session.goto(SaveState::Editing);
                next.payload.original_message = session.payload.message.clone();
                next.payload.input = TextInput::with_value(&session.payload.message, MESSAGE_LIMIT);
                Some(Step::idle(next))
            }
            _ => None,
        }
    }

    fn on_editing(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match key {
            Key::Enter => {
                let edited = session.payload.input.value().trim().to_string();
                if edited.is_empty() {
                    return Some(Step::idle(
                        session.fail(Cause::precondition("commit message cannot be empty")),
                    ));
                }
                Some(Self::commit(session, edited))
            }
            Key::Esc | Key::CtrlC => {
                let mut next = session.goto(SaveState::Confirming);
                next.payload.message = session.payload.original_message.clone();
                Some(Step::idle(next))
            }
            key => {
                let mut next = session.clone();
                next.payload.input.apply(key).then(|| Step::idle(next))
            }
        }
    }
}

impl Flow for SaveFlow {
    type State = SaveState;
    type Payload = SavePayload;
    type Effect = SaveEffect;
    type Outcome = SaveOutcome;

    const NAME: &'static str = "save";

    fn start(session: &Session<Self>) -> Step<Self> {
        if session.payload.custom_message.is_some() {
            Step::run(session.goto(SaveState::Staging), SaveEffect::StageAll)
        } else {
            Step::run(session.goto(SaveState::Checking), SaveEffect::CheckGenerator)
        }
    }

    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
        match session.state {
            SaveState::Confirming => Self::on_confirming(session, key),
            SaveState::Editing => Self::on_editing(session, key),
            _ => None,
        }
    }

    fn on_outcome(session: &Session<Self>, outcome: SaveOutcome) -> Step<Self> {
        match (session.state, outcome) {
            (SaveState::Checking, SaveOutcome::GeneratorChecked(false)) => Step::idle(session.fail(
                Cause::precondition("Ollama is not running. Please start Ollama first"),
            )),
            (SaveState::Checking, SaveOutcome::GeneratorChecked(true)) => {
                Step::run(session.goto(SaveState::Staging), SaveEffect::StageAll)
            }
            (SaveState::Staging, SaveOutcome::Staged(Ok(()))) => {
                Step::run(session.goto(SaveState::Diffing), SaveEffect::GetDiff)
            }
            (SaveState::Diffing, SaveOutcome::Diff(Ok(diff))) => {
                if diff.trim().is_empty() {
                    return Step::idle(session.fail(Cause::domain("no changes to commit")));
                }
                let mut next = session.clone();
                next.payload.diff = diff.clone();
                match &session.payload.custom_message {
                    Some(message) => {
                        next.payload.message = message.trim().to_string();
                        Step::idle(next.goto(SaveState::Confirming))
                    }
                    None => Step::run(
                        next.goto(SaveState::Generating),
                        SaveEffect::Generate {
                            diff,
                            seed: session.payload.seed,
                        },
                    ),
                }
            }
            (SaveState::Generating, SaveOutcome::Generated(Ok(message))) => {
                let message = message.trim();
                if message.is_empty() {
                    return Step::idle(session.fail(Cause::domain(
                        "AI generated an empty commit message. Try again or use custom message",
                    )));
                }
                if !is_conventional(message) {
                    return Step::idle(session.fail(Cause::domain(format!(
                        "Invalid commit message format: {:?}. Expected: type: description",
                        message
                    ))));
                }
                let mut next = session.goto(SaveState::Confirming);
                next.payload.message = message.to_string();
                Step::idle(next)
            }
            (SaveState::Committing, SaveOutcome::Committed(Ok(()))) => {
                Step::idle(session.goto(SaveState::Done))
            }
            (
                _,
                SaveOutcome::Staged(Err(err))
                | SaveOutcome::Diff(Err(err))
                | SaveOutcome::Generated(Err(err))
                | SaveOutcome::Committed(Err(err)),
            ) => Step::idle(session.fail(err.into())),
            _ => Step::idle(session.clone()),
        }
    }

    fn render(session: &Session<Self>) -> String {
        let payload = &session.payload;
        match session.state {
            SaveState::Init | SaveState::Closed => String::new(),
            SaveState::Checking => "Checking Ollama...".to_string(),
            SaveState::Staging => "Staging changes...".to_string(),
            SaveState::Diffing => "Getting changes...".to_string(),
            SaveState::Generating => "Generating commit message...".to_string(),
            SaveState::Confirming => {
                let kind = if payload.custom_message.is_some() {
                    "Custom"
                } else {
                    "Generated"
                };
                format!(
                    "\n{BOLD}{MAGENTA}{}{RESET} {GRAY}[{} message]{RESET}\n\n{}",
                    payload.message,
                    kind,
                    key_hints(&[("y", "commit"), ("n", "cancel"), ("e", "edit")])
                )
            }
            SaveState::Editing => format!(
                "\n{}\n{}\n\n{}",
                title("Edit commit message"),
                payload.input.view(),
                key_hints(&[("enter", "save"), ("esc", "cancel edit")])
            ),
            SaveState::Committing => "Committing...".to_string(),
            SaveState::Done => success_line("Changes committed successfully!"),
            SaveState::Error => render_failure(session.last_error.as_ref()),
        }
    }

    fn perform(effect: SaveEffect, services: &Services) -> SaveOutcome {
        match effect {
            SaveEffect::CheckGenerator => {
                SaveOutcome::GeneratorChecked(services.generator.is_available())
            }
            SaveEffect::StageAll => SaveOutcome::Staged(super::effect(git::stage_all())),
            SaveEffect::GetDiff => SaveOutcome::Diff(super::effect(git::diff())),
            SaveEffect::Generate { diff, seed } => SaveOutcome::Generated(
                services
                    .generator
                    .generate(&diff, seed)
                    .map_err(EffectError::from),
            ),
            SaveEffect::Commit { message } => {
                SaveOutcome::Committed(super::effect(git::commit(&message)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{complete, press, start};

    fn confirming(message: &str) -> Session<SaveFlow> {
        let mut session = Session::<SaveFlow>::new(SavePayload::new(42, None), 80);
        session.state = SaveState::Confirming;
        session.payload.diff = "+x".to_string();
        session.payload.message = message.to_string();
        session
    }

    fn generating() -> Session<SaveFlow> {
        let mut session = Session::<SaveFlow>::new(SavePayload::new(42, None), 80);
        session.state = SaveState::Generating;
        session
    }

    #[test]
    fn test_start_checks_generator_first() {
        let step = start::<SaveFlow>(SavePayload::new(7, None));
        assert_eq!(step.session.state, SaveState::Checking);
        assert_eq!(step.effect, Some(SaveEffect::CheckGenerator));
    }

    #[test]
    fn test_custom_message_skips_generation() {
        let step = start::<SaveFlow>(SavePayload::new(7, Some("fix: typo".to_string())));
        assert_eq!(step.session.state, SaveState::Staging);
        assert_eq!(step.effect, Some(SaveEffect::StageAll));

        let step = complete(&step.session, SaveOutcome::Staged(Ok(())));
        assert_eq!(step.effect, Some(SaveEffect::GetDiff));
        let step = complete(&step.session, SaveOutcome::Diff(Ok("+a".to_string())));
        assert_eq!(step.session.state, SaveState::Confirming);
        assert_eq!(step.session.payload.message, "fix: typo");
        assert!(step.effect.is_none());
        assert!(SaveFlow::render(&step.session).contains("[Custom message]"));
    }

    #[test]
    fn test_blank_custom_message_means_generate() {
        let step = start::<SaveFlow>(SavePayload::new(7, Some("   ".to_string())));
        assert_eq!(step.session.state, SaveState::Checking);
    }

    #[test]
    fn test_generator_down_is_precondition_failure() {
        let step = start::<SaveFlow>(SavePayload::new(7, None));
        let step = complete(&step.session, SaveOutcome::GeneratorChecked(false));
        assert_eq!(step.session.state, SaveState::Error);
        assert!(matches!(
            step.session.last_error,
            Some(Cause::Precondition(ref m)) if m.contains("Ollama is not running")
        ));
    }

    #[test]
    fn test_happy_path_schedules_one_effect_per_step() {
        let step = start::<SaveFlow>(SavePayload::new(7, None));
        let step = complete(&step.session, SaveOutcome::GeneratorChecked(true));
        assert_eq!(step.effect, Some(SaveEffect::StageAll));
        let step = complete(&step.session, SaveOutcome::Staged(Ok(())));
        let step = complete(&step.session, SaveOutcome::Diff(Ok("+line".to_string())));
        assert_eq!(
            step.effect,
            Some(SaveEffect::Generate {
                diff: "+line".to_string(),
                seed: 7
            })
        );
        let step = complete(
            &step.session,
            SaveOutcome::Generated(Ok("  feat: add line ".to_string())),
        );
        assert_eq!(step.session.state, SaveState::Confirming);
        assert_eq!(step.session.payload.message, "feat: add line");
        let step = press(&step.session, &["y"]);
        assert_eq!(step.session.state, SaveState::Committing);
        let step = complete(&step.session, SaveOutcome::Committed(Ok(())));
        assert_eq!(step.session.state, SaveState::Done);
        assert!(step.session.last_error.is_none());
        assert!(SaveFlow::render(&step.session).contains("Changes committed successfully!"));
    }

    #[test]
    fn test_empty_diff_is_no_changes() {
        let mut session = Session::<SaveFlow>::new(SavePayload::new(1, None), 80);
        session.state = SaveState::Diffing;
        for diff in ["", "  \n\t"] {
            let step = complete(&session, SaveOutcome::Diff(Ok(diff.to_string())));
            assert_eq!(step.session.state, SaveState::Error);
            assert_eq!(step.session.last_error, Some(Cause::domain("no changes to commit")));
            assert!(step.effect.is_none());
        }
    }

    #[test]
    fn test_whitespace_generation_is_domain_failure() {
        let step = complete(&generating(), SaveOutcome::Generated(Ok("  ".to_string())));
        assert_eq!(step.session.state, SaveState::Error);
        assert!(matches!(step.session.last_error, Some(Cause::Domain(ref m)) if m.contains("empty")));
    }

    #[test]
    fn test_malformed_generation_is_domain_failure() {
        for bad in ["add a feature", ": no type", "feat:   "] {
            let step = complete(&generating(), SaveOutcome::Generated(Ok(bad.to_string())));
            assert_eq!(step.session.state, SaveState::Error, "{:?}", bad);
            assert!(matches!(
                step.session.last_error,
                Some(Cause::Domain(ref m)) if m.contains("Invalid commit message format")
            ));
        }
    }

    #[test]
    fn test_generation_error_is_effect_failure() {
        let step = complete(
            &generating(),
            SaveOutcome::Generated(Err(EffectError::from("connection refused"))),
        );
        assert_eq!(
            step.session.last_error,
            Some(Cause::Effect("connection refused".to_string()))
        );
    }

    #[test]
    fn test_confirm_yes_commits_current_message() {
        let step = press(&confirming("feat: x"), &["y"]);
        assert_eq!(step.session.state, SaveState::Committing);
        assert_eq!(
            step.effect,
            Some(SaveEffect::Commit {
                message: "feat: x".to_string()
            })
        );
    }

    #[test]
    fn test_decline_cancels() {
        for key in ["n", "q", "ctrl+c"] {
            let step = press(&confirming("feat: x"), &[key]);
            assert_eq!(step.session.state, SaveState::Error);
            assert_eq!(step.session.last_error, Some(Cause::cancelled("commit")));
            assert!(step.effect.is_none());
        }
    }

    #[test]
    fn test_edit_then_save() {
        let step = press(&confirming("feat: x"), &["e", "ctrl+u", "f", "i", "x", ":", " ", "y"]);
        assert_eq!(step.session.state, SaveState::Editing);
        assert_eq!(step.session.payload.input.value(), "fix: y");
        let step = press(&step.session, &["enter"]);
        assert_eq!(step.session.state, SaveState::Committing);
        assert_eq!(
            step.effect,
            Some(SaveEffect::Commit {
                message: "fix: y".to_string()
            })
        );
    }

    #[test]
    fn test_edit_keeps_q_as_text() {
        let step = press(&confirming("feat: x"), &["e", "q"]);
        assert_eq!(step.session.state, SaveState::Editing);
        assert_eq!(step.session.payload.input.value(), "feat: xq");
    }

    #[test]
    fn test_cancel_edit_restores_message() {
        let session = confirming("feat: original");
        let step = press(&session, &["e", "backspace", "backspace", "esc"]);
        assert_eq!(step.session.state, SaveState::Confirming);
        assert_eq!(step.session.payload.message, "feat: original");
        assert!(step.effect.is_none());

        let step = press(&session, &["e", "ctrl+u", "ctrl+c"]);
        assert_eq!(step.session.state, SaveState::Confirming);
        assert_eq!(step.session.payload.message, "feat: original");
    }

    #[test]
    fn test_empty_edit_is_failure() {
        let step = press(&confirming("feat: x"), &["e", "ctrl+u", " ", "enter"]);
        assert_eq!(step.session.state, SaveState::Error);
        assert_eq!(
            step.session.last_error,
            Some(Cause::precondition("commit message cannot be empty"))
        );
        assert!(step.effect.is_none());
    }

    #[test]
    fn test_in_flight_keys_do_nothing() {
        let step = press(&generating(), &["y", "e", "enter"]);
        assert_eq!(step.session, generating());
        assert!(step.effect.is_none());
    }

    #[test]
    fn test_is_conventional() {
        assert!(is_conventional("feat: add x"));
        assert!(is_conventional("fix(parser): handle y"));
        assert!(!is_conventional("add x"));
        assert!(!is_conventional(" : x"));
        assert!(!is_conventional("feat:"));
    }

    #[test]
    fn test_render_confirming_shows_generated_marker() {
        let render = SaveFlow::render(&confirming("feat: x"));
        assert!(render.contains("feat: x"));
        assert!(render.contains("[Generated message]"));
    }
}
