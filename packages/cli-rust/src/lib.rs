//! ssh-rotate CLI - Rotate SSH keys across a fleet of hosts
//!
//! This module contains the shared CLI implementation used by the binary.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use ssh_rotate_core::{config, get_version, get_version_long, load_config};
use tracing_subscriber::EnvFilter;

/// Replace a shared SSH key with one key per host
#[derive(Parser)]
#[command(name = "ssh-rotate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replace a shared SSH key with one key per host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate per-host keys, install them and update ~/.ssh/config
    Rotate(commands::RotateArgs),
    /// Inspect configuration
    Config(commands::ConfigArgs),
}

/// Install the stderr log subscriber
///
/// `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Configure color output
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let config_path = config::get_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

    let config = match load_config() {
        Ok(config) => {
            tracing::debug!("Config loaded from: {}", config_path.display());
            config
        }
        Err(e) => {
            // Display rich error for invalid config
            eprintln!("{} Configuration error", style("Error:").red().bold());
            eprintln!();
            eprintln!("  {e:#}");
            eprintln!();
            eprintln!("  Config file: {}", style(config_path.display()).yellow());
            eprintln!();
            eprintln!(
                "  {} Check the config file for syntax errors or unknown fields.",
                style("Tip:").cyan()
            );
            eprintln!(
                "  {} Run {} to see the settings in effect.",
                style("Tip:").cyan(),
                style("ssh-rotate config show").green()
            );
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Rotate(args)) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::cmd_rotate(&args, &config, cli.quiet))
        }
        Some(Commands::Config(args)) => commands::cmd_config(args, &config, cli.quiet),
        None => {
            // No command - show a welcome message and hint to use --help
            if !cli.quiet {
                println!(
                    "{} {}",
                    style("ssh-rotate").cyan().bold(),
                    style(if cli.verbose > 0 {
                        get_version_long()
                    } else {
                        get_version()
                    })
                    .dim()
                );
                println!();
                println!(
                    "Run {} to rotate the hosts in {}, or {} for all commands.",
                    style("ssh-rotate rotate").green(),
                    style(&config.hosts_file).yellow(),
                    style("--help").green()
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ssh-rotate", "rotate", "-vv", "--quiet", "--yes"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Some(Commands::Rotate(_))));
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["ssh-rotate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["ssh-rotate", "install"]).is_err());
    }
}
