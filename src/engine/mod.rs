//! The interactive session engine shared by every snap workflow.
//!
//! A workflow is a [`Flow`]: a closed state enum, a payload, the effects it
//! can request and the outcomes those effects produce. [`transition`] is the
//! single entry point the driver calls; it applies the rules common to every
//! flow (terminal states are final, in-flight states only honor quit, stray
//! completions are dropped) and delegates the rest to the flow.
//!
//! - [`key`] - key tokens
//! - [`filter`] - list filtering for the browsing flows
//! - [`text_input`] - single-line editing buffer
//! - [`runner`] - effect execution and the one-in-flight scheduler
//! - [`driver`] - the event loop and terminal surface

pub mod driver;
pub mod filter;
pub mod key;
pub mod runner;
pub mod text_input;

pub use driver::{drive, Input, Surface, TerminalSurface};
pub use filter::{ListFilter, Searchable};
pub use key::Key;
pub use runner::{Runner, Scheduler, Services, ThreadRunner};
pub use text_input::TextInput;

use crate::error::Cause;
use std::fmt;

/// The closed state enum of one flow.
pub trait FlowState: Copy + Eq + fmt::Debug + Send + 'static {
    /// State a fresh session starts in; only here is `Event::Start` honored.
    const INITIAL: Self;
    /// Terminal state reached by quitting. Never carries an error.
    const CLOSED: Self;
    /// Terminal state every failure routes to.
    const FAILED: Self;

    fn is_terminal(self) -> bool;

    /// True while an effect requested by the previous transition is running.
    fn is_in_flight(self) -> bool;
}

/// One concrete parameterization of the session engine.
pub trait Flow: Sized + 'static {
    type State: FlowState;
    type Payload: Clone + fmt::Debug + PartialEq + Send;
    type Effect: Clone + fmt::Debug + PartialEq + Send + 'static;
    type Outcome: Clone + fmt::Debug + PartialEq + Send + 'static;

    const NAME: &'static str;

    /// Leave `INITIAL`, normally by requesting the first effect.
    fn start(session: &Session<Self>) -> Step<Self>;

    /// Handle a key in a non-terminal, non-in-flight state.
    ///
    /// `None` means the flow does not claim the key; the engine then treats
    /// quit tokens as "close" and ignores everything else.
    fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>>;

    /// Handle the completion of the effect the current state is waiting on.
    fn on_outcome(session: &Session<Self>, outcome: Self::Outcome) -> Step<Self>;

    /// Display string for the current state. Pure.
    fn render(session: &Session<Self>) -> String;

    /// Execute one effect against the outside world.
    fn perform(effect: Self::Effect, services: &Services) -> Self::Outcome;
}

/// Current state plus payload of one interactive flow instance.
pub struct Session<F: Flow> {
    pub state: F::State,
    pub payload: F::Payload,
    pub last_error: Option<Cause>,
    /// Terminal width in columns, used by renderers for truncation.
    pub width: u16,
}

impl<F: Flow> Session<F> {
    pub fn new(payload: F::Payload, width: u16) -> Self {
        Self {
            state: F::State::INITIAL,
            payload,
            last_error: None,
            width,
        }
    }

    /// Same payload, different state.
    pub fn goto(&self, state: F::State) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Route to the failure state with `cause`.
    pub fn fail(&self, cause: Cause) -> Self {
        Self {
            state: F::State::FAILED,
            last_error: Some(cause),
            ..self.clone()
        }
    }

    pub fn close(&self) -> Self {
        self.goto(F::State::CLOSED)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Process exit status for a finished session.
    pub fn exit_code(&self) -> i32 {
        if self.last_error.is_some() {
            1
        } else {
            0
        }
    }
}

impl<F: Flow> Clone for Session<F> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            payload: self.payload.clone(),
            last_error: self.last_error.clone(),
            width: self.width,
        }
    }
}

impl<F: Flow> PartialEq for Session<F> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.payload == other.payload
            && self.last_error == other.last_error
            && self.width == other.width
    }
}

impl<F: Flow> fmt::Debug for Session<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("flow", &F::NAME)
            .field("state", &self.state)
            .field("payload", &self.payload)
            .field("last_error", &self.last_error)
            .field("width", &self.width)
            .finish()
    }
}

/// Result of one transition: the next session and at most one effect.
pub struct Step<F: Flow> {
    pub session: Session<F>,
    pub effect: Option<F::Effect>,
}

impl<F: Flow> Step<F> {
    /// No effect requested.
    pub fn idle(session: Session<F>) -> Self {
        Self {
            session,
            effect: None,
        }
    }

    pub fn run(session: Session<F>, effect: F::Effect) -> Self {
        Self {
            session,
            effect: Some(effect),
        }
    }
}

impl<F: Flow> Clone for Step<F> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<F: Flow> PartialEq for Step<F> {
    fn eq(&self, other: &Self) -> bool {
        self.session == other.session && self.effect == other.effect
    }
}

impl<F: Flow> fmt::Debug for Step<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("session", &self.session)
            .field("effect", &self.effect)
            .finish()
    }
}

/// Input to [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event<O> {
    Start,
    Key(Key),
    Resize(u16, u16),
    Completed(O),
}

/// Compute the next session for `event`. Pure; never blocks.
pub fn transition<F: Flow>(session: &Session<F>, event: Event<F::Outcome>) -> Step<F> {
    if session.state.is_terminal() {
        return Step::idle(session.clone());
    }

    match event {
        Event::Start if session.state == F::State::INITIAL => F::start(session),
        Event::Start => Step::idle(session.clone()),
        Event::Resize(width, _) => {
            let mut next = session.clone();
            next.width = width;
            Step::idle(next)
        }
        Event::Key(key) if session.state.is_in_flight() => {
            if key.is_quit() {
                Step::idle(session.close())
            } else {
                Step::idle(session.clone())
            }
        }
        Event::Key(key) => match F::on_key(session, key) {
            Some(step) => step,
            None if key.is_quit() => Step::idle(session.close()),
            None => Step::idle(session.clone()),
        },
        Event::Completed(outcome) if session.state.is_in_flight() => {
            F::on_outcome(session, outcome)
        }
        Event::Completed(_) => Step::idle(session.clone()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A minimal two-effect flow used to exercise the engine and driver.

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PingState {
        Init,
        Pinging,
        Confirming,
        Ponging,
        Done,
        Closed,
        Error,
    }

    impl FlowState for PingState {
        const INITIAL: Self = PingState::Init;
        const CLOSED: Self = PingState::Closed;
        const FAILED: Self = PingState::Error;

        fn is_terminal(self) -> bool {
            matches!(self, PingState::Done | PingState::Closed | PingState::Error)
        }

        fn is_in_flight(self) -> bool {
            matches!(self, PingState::Pinging | PingState::Ponging)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum PingEffect {
        Ping,
        Pong(u32),
    }

    pub struct PingFlow;

    impl Flow for PingFlow {
        type State = PingState;
        type Payload = u32;
        type Effect = PingEffect;
        type Outcome = Result<u32, crate::error::EffectError>;

        const NAME: &'static str = "ping";

        fn start(session: &Session<Self>) -> Step<Self> {
            Step::run(session.goto(PingState::Pinging), PingEffect::Ping)
        }

        fn on_key(session: &Session<Self>, key: Key) -> Option<Step<Self>> {
            match (session.state, key) {
                (PingState::Confirming, Key::Char('y')) => Some(Step::run(
                    session.goto(PingState::Ponging),
                    PingEffect::Pong(session.payload),
                )),
                (PingState::Confirming, Key::Char('n') | Key::Char('q') | Key::CtrlC) => {
                    Some(Step::idle(session.fail(Cause::cancelled("ping"))))
                }
                _ => None,
            }
        }

        fn on_outcome(session: &Session<Self>, outcome: Self::Outcome) -> Step<Self> {
            match (session.state, outcome) {
                (_, Err(err)) => Step::idle(session.fail(err.into())),
                (PingState::Pinging, Ok(0)) => Step::idle(session.fail(Cause::domain("zero"))),
                (PingState::Pinging, Ok(n)) => {
                    let mut next = session.goto(PingState::Confirming);
                    next.payload = n;
                    Step::idle(next)
                }
                (PingState::Ponging, Ok(_)) => Step::idle(session.goto(PingState::Done)),
                _ => Step::idle(session.clone()),
            }
        }

        fn render(session: &Session<Self>) -> String {
            format!("{:?} {}", session.state, session.payload)
        }

        fn perform(effect: PingEffect, _services: &Services) -> Self::Outcome {
            match effect {
                PingEffect::Ping => Ok(7),
                PingEffect::Pong(n) => Ok(n + 1),
            }
        }
    }

    pub fn session(state: PingState, payload: u32) -> Session<PingFlow> {
        let mut session = Session::<PingFlow>::new(payload, 80);
        session.state = state;
        session
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_start_only_honored_in_initial() {
        let fresh = Session::<PingFlow>::new(0, 80);
        let step = transition(&fresh, Event::Start);
        assert_eq!(step.session.state, PingState::Pinging);
        assert_eq!(step.effect, Some(PingEffect::Ping));

        let again = transition(&step.session, Event::Start);
        assert_eq!(again.session, step.session);
        assert_eq!(again.effect, None);
    }

    #[test]
    fn test_transition_is_pure() {
        let s = session(PingState::Confirming, 3);
        for event in [
            Event::Key(Key::Char('y')),
            Event::Key(Key::Char('n')),
            Event::Key(Key::Char('x')),
            Event::Completed(Ok(1)),
            Event::Resize(40, 10),
        ] {
            assert_eq!(transition(&s, event.clone()), transition(&s, event));
        }
    }

    #[test]
    fn test_terminal_sessions_ignore_everything() {
        for state in [PingState::Done, PingState::Closed, PingState::Error] {
            let s = session(state, 1);
            for event in [
                Event::Start,
                Event::Key(Key::CtrlC),
                Event::Completed(Ok(2)),
                Event::Resize(10, 10),
            ] {
                let step = transition(&s, event);
                assert_eq!(step.session, s);
                assert!(step.effect.is_none());
            }
        }
    }

    #[test]
    fn test_in_flight_ignores_keys_except_quit() {
        let s = session(PingState::Pinging, 0);
        let step = transition(&s, Event::Key(Key::Char('y')));
        assert_eq!(step.session, s);
        assert!(step.effect.is_none());

        let step = transition(&s, Event::Key(Key::CtrlC));
        assert_eq!(step.session.state, PingState::Closed);
        assert!(step.session.last_error.is_none());
        assert!(step.effect.is_none());
    }

    #[test]
    fn test_unclaimed_quit_closes_and_other_keys_are_ignored() {
        let s = session(PingState::Init, 0);
        assert_eq!(transition(&s, Event::Key(Key::Char('z'))).session, s);
        assert_eq!(
            transition(&s, Event::Key(Key::Char('q'))).session.state,
            PingState::Closed
        );
    }

    #[test]
    fn test_flow_claimed_quit_is_decline() {
        let s = session(PingState::Confirming, 4);
        let step = transition(&s, Event::Key(Key::Char('q')));
        assert_eq!(step.session.state, PingState::Error);
        assert_eq!(step.session.last_error, Some(Cause::cancelled("ping")));
        assert!(step.effect.is_none());
        assert_eq!(step.session.exit_code(), 1);
    }

    #[test]
    fn test_completion_outside_in_flight_is_dropped() {
        let s = session(PingState::Confirming, 4);
        let step = transition(&s, Event::Completed(Ok(99)));
        assert_eq!(step.session, s);
    }

    #[test]
    fn test_effect_error_routes_to_failed() {
        let s = session(PingState::Pinging, 0);
        let step = transition(&s, Event::Completed(Err("boom".into())));
        assert_eq!(step.session.state, PingState::Error);
        assert_eq!(step.session.last_error, Some(Cause::Effect("boom".into())));
    }

    #[test]
    fn test_resize_updates_width_only() {
        let s = session(PingState::Confirming, 4);
        let step = transition(&s, Event::Resize(120, 40));
        assert_eq!(step.session.width, 120);
        assert_eq!(step.session.state, PingState::Confirming);
        assert_eq!(step.session.payload, 4);
    }
}
