//! Effect execution.
//!
//! A [`Runner`] executes one effect away from the input path and reports the
//! outcome on a channel. The [`Scheduler`] sits between the driver and the
//! runner and refuses to start a second effect while one is outstanding.

use super::Flow;
use crate::error::{Result, SnapError};
use crate::ollama::MessageGenerator;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Collaborators effects may use besides git.
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn MessageGenerator>,
}

impl Services {
    pub fn new(generator: Arc<dyn MessageGenerator>) -> Self {
        Self { generator }
    }
}

pub trait Runner {
    /// Execute `effect` and eventually send its outcome on `done`.
    fn run<F: Flow>(&self, effect: F::Effect, done: Sender<F::Outcome>) -> Result<()>;
}

/// Runs each effect on its own worker thread.
pub struct ThreadRunner {
    services: Arc<Services>,
}

impl ThreadRunner {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

impl Runner for ThreadRunner {
    fn run<F: Flow>(&self, effect: F::Effect, done: Sender<F::Outcome>) -> Result<()> {
        let services = Arc::clone(&self.services);
        thread::Builder::new()
            .name(format!("snap-{}-effect", F::NAME))
            .spawn(move || {
                tracing::debug!(flow = F::NAME, ?effect, "effect started");
                let outcome = F::perform(effect, &services);
                tracing::debug!(flow = F::NAME, ?outcome, "effect finished");
                // The receiver is gone if the user quit mid-flight.
                let _ = done.send(outcome);
            })?;
        Ok(())
    }
}

/// Runs each effect on the calling thread. Outcomes are queued on the
/// channel before `run` returns, which keeps driver tests deterministic.
#[cfg(test)]
pub struct InlineRunner {
    services: Services,
}

#[cfg(test)]
impl InlineRunner {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[cfg(test)]
impl Runner for InlineRunner {
    fn run<F: Flow>(&self, effect: F::Effect, done: Sender<F::Outcome>) -> Result<()> {
        let _ = done.send(F::perform(effect, &self.services));
        Ok(())
    }
}

/// Tracks the single outstanding effect of a session.
pub struct Scheduler<F: Flow> {
    outstanding: Option<F::Effect>,
    tx: Sender<F::Outcome>,
    rx: Receiver<F::Outcome>,
}

impl<F: Flow> Default for Scheduler<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flow> Scheduler<F> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            outstanding: None,
            tx,
            rx,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding.is_none()
    }

    /// Hand `effect` to `runner`. Fails if an earlier effect has not completed.
    pub fn schedule<R: Runner>(&mut self, runner: &R, effect: F::Effect) -> Result<()> {
        if let Some(current) = &self.outstanding {
            return Err(SnapError::EffectAlreadyInFlight(format!(
                "{}: {:?} still running, refused {:?}",
                F::NAME,
                current,
                effect
            )));
        }
        self.outstanding = Some(effect.clone());
        runner.run::<F>(effect, self.tx.clone())
    }

    /// Take the outcome of the outstanding effect if it has arrived.
    pub fn try_complete(&mut self) -> Option<F::Outcome> {
        self.outstanding.as_ref()?;
        match self.rx.try_recv() {
            Ok(outcome) => {
                self.outstanding = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the outstanding effect to complete.
    pub fn wait(&mut self, timeout: Duration) -> Option<F::Outcome> {
        self.outstanding.as_ref()?;
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.outstanding = None;
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
