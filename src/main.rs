//! snap CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use clap::Parser;
use snap::cli::{BranchAction, Cli, Commands, ConfigAction, TagsAction};
use snap::commands::{
    branch_command, changes_command, completions_command, config_path_command,
    config_set_command, config_show_command, init_command, replay_command, save_command,
    stack_command, sync_command, tags_command, tags_create_command, tags_diff_command,
};
use snap::error::Result;
use snap::flows::BranchCommand;
use snap::logging::init_logging;
use snap::output::{print_error, print_warning};

/// Exit code 0 for plain commands that succeed.
fn done(result: Result<()>) -> Result<i32> {
    result.map(|()| 0)
}

fn branch_command_for(action: Option<BranchAction>) -> BranchCommand {
    match action {
        None => BranchCommand::List,
        Some(BranchAction::New { name }) => BranchCommand::Create(name),
        Some(BranchAction::Switch { name }) => BranchCommand::Switch(name),
        Some(BranchAction::Delete { name }) => BranchCommand::Delete(name),
    }
}

fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Init => done(init_command()),
        Commands::Save {
            message,
            message_flag,
            seed,
        } => save_command(message.or(message_flag), seed),
        Commands::Changes => done(changes_command()),
        Commands::Sync { from } => sync_command(from),
        Commands::Stack {
            all,
            mine,
            limit,
            path,
        } => stack_command(all, mine, limit, path),
        Commands::Branch { action } => branch_command(branch_command_for(action)),
        Commands::Replay { branch } => replay_command(&branch),
        Commands::Tags { action } => match action {
            None => tags_command(),
            Some(TagsAction::Diff) => tags_diff_command(),
            Some(TagsAction::Create { name }) => tags_create_command(&name),
        },
        Commands::Config { action } => done(match action {
            None | Some(ConfigAction::Show) => config_show_command(),
            Some(ConfigAction::Set { key, value }) => config_set_command(&key, &value),
            Some(ConfigAction::Path) => config_path_command(),
        }),
        Commands::Completions { shell, install } => {
            done(completions_command(shell.as_deref(), install))
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        print_warning(&format!("Logging disabled: {}", e));
    }

    // arg_required_else_help makes clap print help when no command is given.
    let Some(command) = cli.command else {
        return;
    };

    match dispatch(command) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}
