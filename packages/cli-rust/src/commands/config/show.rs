//! Config show subcommand
//!
//! Displays the effective settings in table or JSON format.

use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use ssh_rotate_core::keys::KeyType;
use ssh_rotate_core::{Config, Settings, config};

use crate::commands::settings::SettingsArgs;

/// Show effective settings
///
/// File values with environment and flag overrides applied, paths expanded.
pub fn cmd_config_show(
    config: &Config,
    overrides: &SettingsArgs,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let settings = overrides.resolve(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("{}", settings_table(&settings));

    // Show config file location
    if !quiet {
        if let Some(path) = config::get_config_path() {
            println!();
            let state = if path.exists() {
                ""
            } else {
                " (not present, using defaults)"
            };
            println!("Config file: {}{state}", path.display());
        }
    }

    Ok(())
}

fn settings_table(settings: &Settings) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);

    let rows = [
        ("old_key", settings.old_key.display().to_string()),
        ("default_user", settings.default_user.clone()),
        ("key_type", settings.key_type.to_string()),
        ("key_bits", format_key_bits(settings.key_type, settings.key_bits)),
        ("key_dir", settings.key_dir.display().to_string()),
        ("hosts_file", settings.hosts_file.display().to_string()),
        ("ssh_config", settings.ssh_config.display().to_string()),
        ("connect_timeout", format!("{}s", settings.connect_timeout)),
        ("jobs", settings.jobs.to_string()),
    ];
    for (key, value) in rows {
        let cell = if key == "old_key" && !settings.old_key.exists() {
            Cell::new(format!("{value} (missing)")).fg(Color::Yellow)
        } else {
            Cell::new(value)
        };
        table.add_row(vec![Cell::new(key), cell]);
    }

    table
}

/// Key size only matters for RSA
fn format_key_bits(key_type: KeyType, bits: usize) -> String {
    match key_type {
        KeyType::Rsa => bits.to_string(),
        KeyType::Ed25519 => format!("{bits} (unused for ed25519)"),
    }
}
