//! Config command handler.
//!
//! Displays and modifies `~/.config/snap/config.toml`.

use crate::config::{config_path, load_config, save_config, Config};
use crate::error::Result;
use crate::output::{print_success, BOLD, CYAN, GRAY, RESET};

/// Print the effective configuration as TOML.
pub fn config_show_command() -> Result<()> {
    let config = load_config()?;
    println!("{BOLD}# snap config{RESET}");
    println!("{GRAY}# {}{RESET}", config_path()?.display());
    println!();
    print!("{}", config_as_toml(&config));
    Ok(())
}

pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    let mut config = load_config()?;
    config.set(key, value)?;
    save_config(&config)?;
    tracing::info!(key, value, "config updated");
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

pub fn config_path_command() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn config_as_toml(config: &Config) -> String {
    format!(
        "{CYAN}ollama_url{RESET} = \"{}\"\n\
         {CYAN}model{RESET} = \"{}\"\n\
         {CYAN}temperature{RESET} = {}\n\
         {CYAN}seed{RESET} = {}\n\
         {CYAN}request_timeout_secs{RESET} = {}\n\
         {CYAN}chunk_threshold{RESET} = {}\n\
         {CYAN}stack_limit{RESET} = {}\n",
        config.ollama_url,
        config.model,
        config.temperature,
        config.seed,
        config.request_timeout_secs,
        config.chunk_threshold,
        config.stack_limit
    )
}
