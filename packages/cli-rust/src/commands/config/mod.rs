//! Config subcommand implementations
//!
//! Provides `ssh-rotate config` subcommands for viewing configuration.

mod show;

use anyhow::Result;
use clap::{Args, Subcommand};
use ssh_rotate_core::Config;

use super::settings::SettingsArgs;

pub use show::cmd_config_show;

/// Configuration command arguments
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show the settings a run would use
    Show {
        /// Output as JSON instead of table format
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Handle config command
///
/// If no subcommand is given, defaults to Show.
pub fn cmd_config(args: ConfigArgs, config: &Config, quiet: bool) -> Result<()> {
    match args.command {
        Some(ConfigSubcommands::Show { json, settings }) => {
            cmd_config_show(config, &settings, json, quiet)
        }
        None => cmd_config_show(config, &SettingsArgs::default(), false, quiet),
    }
}
