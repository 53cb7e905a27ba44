//! Launchers for the interactive flows.
//!
//! Each launcher builds the flow's payload from command-line arguments and
//! config, then hands the session to the terminal driver. The returned
//! value is the process exit code.

use crate::config::load_config;
use crate::engine::driver::terminal_width;
use crate::engine::{drive, Flow, Services, Session, TerminalSurface, ThreadRunner};
use crate::error::Result;
use crate::flows::branch::BranchPayload;
use crate::flows::replay::ReplayPayload;
use crate::flows::save::SavePayload;
use crate::flows::stack::StackPayload;
use crate::flows::sync::SyncPayload;
use crate::flows::tag_create::TagCreatePayload;
use crate::flows::{
    BranchCommand, BranchFlow, ReplayFlow, SaveFlow, StackFlow, StackQuery, SyncFlow,
    TagCreateFlow, TagDiffFlow, TagsFlow,
};
use crate::git;
use crate::ollama::Ollama;
use std::sync::Arc;

fn services() -> Result<Services> {
    let config = load_config()?;
    Ok(Services::new(Arc::new(Ollama::from_config(&config))))
}

/// Drive one session of `F` on the terminal until it reaches a terminal state.
pub fn run_flow<F: Flow>(payload: F::Payload, services: Services) -> Result<i32> {
    git::require_repo()?;
    let session = Session::<F>::new(payload, terminal_width());
    let mut surface = TerminalSurface::new()?;
    let runner = ThreadRunner::new(services);

    tracing::info!(flow = F::NAME, "session started");
    let finished = drive(session, &mut surface, &runner)?;
    Ok(finished.exit_code())
}

pub fn save_command(message: Option<String>, seed: Option<u64>) -> Result<i32> {
    let config = load_config()?;
    let seed = seed.unwrap_or(config.seed);
    let services = Services::new(Arc::new(Ollama::from_config(&config)));
    run_flow::<SaveFlow>(SavePayload::new(seed, message), services)
}

pub fn branch_command(command: BranchCommand) -> Result<i32> {
    run_flow::<BranchFlow>(BranchPayload::new(command), services()?)
}

pub fn replay_command(onto: &str) -> Result<i32> {
    run_flow::<ReplayFlow>(ReplayPayload::new(onto), services()?)
}

pub fn stack_command(all: bool, mine: bool, limit: Option<usize>, path: Option<String>) -> Result<i32> {
    let config = load_config()?;
    let query = StackQuery {
        limit: limit.unwrap_or(config.stack_limit),
        all,
        mine,
        path,
    };
    let services = Services::new(Arc::new(Ollama::from_config(&config)));
    run_flow::<StackFlow>(StackPayload::new(query), services)
}

pub fn tags_command() -> Result<i32> {
    run_flow::<TagsFlow>(Default::default(), services()?)
}

pub fn tags_diff_command() -> Result<i32> {
    run_flow::<TagDiffFlow>(Default::default(), services()?)
}

pub fn tags_create_command(name: &str) -> Result<i32> {
    run_flow::<TagCreateFlow>(TagCreatePayload::new(name), services()?)
}

pub fn sync_command(pull_only: bool) -> Result<i32> {
    run_flow::<SyncFlow>(SyncPayload::new(pull_only), services()?)
}
