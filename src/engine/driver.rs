//! The single-threaded event loop.
//!
//! `drive` feeds events to a session, draws every intermediate state, hands
//! requested effects to the scheduler and stops at the first terminal state.

use super::runner::{Runner, Scheduler};
use super::{transition, Event, Flow, FlowState, Key, Session};
use crate::error::{Result, SnapError};
use crate::output::{spinner_frame, visible_width, CYAN, RESET};
use crossterm::cursor::{Hide, MoveToColumn, MoveUp, Show};
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// Repaint interval for the in-flight spinner.
const TICK: Duration = Duration::from_millis(80);

/// A user input as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key(Key),
    Resize(u16, u16),
}

/// Where frames are drawn and input comes from.
pub trait Surface {
    /// Wait up to `timeout` for the next input.
    fn next_input(&mut self, timeout: Duration) -> Result<Option<Input>>;

    /// Replace the previously drawn frame.
    fn draw(&mut self, frame: &str) -> Result<()>;

    /// Draw the final frame (or keep the last one when `None`) and release
    /// the surface.
    fn finish(&mut self, frame: Option<&str>) -> Result<()>;
}

/// Run `session` to a terminal state.
pub fn drive<F, S, R>(session: Session<F>, surface: &mut S, runner: &R) -> Result<Session<F>>
where
    F: Flow,
    S: Surface,
    R: Runner,
{
    let mut scheduler = Scheduler::<F>::new();
    let mut tick = 0usize;
    let mut session = apply(session, Event::Start, &mut scheduler, runner)?;

    while !session.is_terminal() {
        surface.draw(&frame(&session, tick))?;

        // Completions win over input so a finished effect is never starved.
        if let Some(outcome) = scheduler.try_complete() {
            session = apply(session, Event::Completed(outcome), &mut scheduler, runner)?;
            continue;
        }

        match surface.next_input(TICK)? {
            Some(Input::Key(key)) => {
                session = apply(session, Event::Key(key), &mut scheduler, runner)?;
            }
            Some(Input::Resize(width, height)) => {
                session = apply(session, Event::Resize(width, height), &mut scheduler, runner)?;
            }
            None => tick = tick.wrapping_add(1),
        }
    }

    if session.state == F::State::CLOSED {
        surface.finish(None)?;
    } else {
        surface.finish(Some(&F::render(&session)))?;
    }
    tracing::info!(flow = F::NAME, state = ?session.state, error = ?session.last_error, "session finished");
    Ok(session)
}

fn apply<F: Flow, R: Runner>(
    session: Session<F>,
    event: Event<F::Outcome>,
    scheduler: &mut Scheduler<F>,
    runner: &R,
) -> Result<Session<F>> {
    let step = transition(&session, event);
    if step.session.state != session.state {
        tracing::debug!(
            flow = F::NAME,
            from = ?session.state,
            to = ?step.session.state,
            effect = ?step.effect,
            "transition"
        );
    }
    if let Some(effect) = step.effect {
        scheduler.schedule(runner, effect)?;
    }
    Ok(step.session)
}

/// The render string, with a spinner in front while an effect runs.
fn frame<F: Flow>(session: &Session<F>, tick: usize) -> String {
    let body = F::render(session);
    if session.state.is_in_flight() {
        format!("{CYAN}{}{RESET} {body}", spinner_frame(tick))
    } else {
        body
    }
}

// ============================================================================
// Terminal surface
// ============================================================================

/// Inline repaint region on stdout in raw mode.
///
/// Frames are drawn below the shell prompt rather than on an alternate screen,
/// so the final frame stays in the scrollback.
pub struct TerminalSurface {
    out: Stdout,
    /// Rows occupied by the last frame.
    rows: u16,
    width: u16,
    active: bool,
}

impl TerminalSurface {
    pub fn new() -> Result<Self> {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), Show);
            original_hook(panic_info);
        }));

        enable_raw_mode().map_err(|e| SnapError::Terminal(format!("raw mode: {}", e)))?;
        let mut out = io::stdout();
        execute!(out, Hide)?;

        Ok(Self {
            out,
            rows: 0,
            width: terminal_width(),
            active: true,
        })
    }

    fn clear_previous(&mut self) -> Result<()> {
        queue!(self.out, MoveToColumn(0))?;
        if self.rows > 1 {
            queue!(self.out, MoveUp(self.rows - 1))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            execute!(self.out, Show)?;
            disable_raw_mode().map_err(|e| SnapError::Terminal(format!("raw mode: {}", e)))?;
        }
        Ok(())
    }
}

impl Surface for TerminalSurface {
    fn next_input(&mut self, timeout: Duration) -> Result<Option<Input>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let input = match event::read()? {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                Key::from_event(key).map(Input::Key)
            }
            TermEvent::Resize(width, height) => {
                self.width = width;
                Some(Input::Resize(width, height))
            }
            _ => None,
        };
        Ok(input)
    }

    fn draw(&mut self, frame: &str) -> Result<()> {
        self.clear_previous()?;
        let text = frame.trim_end_matches('\n');
        write!(self.out, "{}", text.replace('\n', "\r\n"))?;
        self.out.flush()?;
        self.rows = rows_needed(text, self.width);
        Ok(())
    }

    fn finish(&mut self, frame: Option<&str>) -> Result<()> {
        if let Some(frame) = frame {
            self.draw(frame)?;
        }
        write!(self.out, "\r\n")?;
        self.out.flush()?;
        self.restore()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Current terminal width, 80 when it cannot be determined.
pub fn terminal_width() -> u16 {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w)
        .unwrap_or(80)
}

/// Screen rows a frame occupies once long lines wrap.
fn rows_needed(frame: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = frame
        .split('\n')
        .map(|line| visible_width(line).max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

// ============================================================================
// Scripted surface (tests)
// ============================================================================

#[cfg(test)]
pub(crate) struct ScriptedSurface {
    inputs: std::collections::VecDeque<Input>,
    pub frames: Vec<String>,
    pub finished: Option<Option<String>>,
}

#[cfg(test)]
impl ScriptedSurface {
    pub fn new(keys: &[&str]) -> Self {
        let inputs = keys
            .iter()
            .map(|name| Input::Key(Key::parse(name).expect("unknown key name")))
            .collect();
        Self {
            inputs,
            frames: Vec::new(),
            finished: None,
        }
    }

    pub fn with_inputs(inputs: Vec<Input>) -> Self {
        Self {
            inputs: inputs.into(),
            frames: Vec::new(),
            finished: None,
        }
    }
}

#[cfg(test)]
impl Surface for ScriptedSurface {
    fn next_input(&mut self, _timeout: Duration) -> Result<Option<Input>> {
        match self.inputs.pop_front() {
            Some(input) => Ok(Some(input)),
            None => Err(SnapError::Terminal("input script exhausted".to_string())),
        }
    }

    fn draw(&mut self, frame: &str) -> Result<()> {
        self.frames.push(frame.to_string());
        Ok(())
    }

    fn finish(&mut self, frame: Option<&str>) -> Result<()> {
        self.finished = Some(frame.map(str::to_string));
        Ok(())
    }
}
