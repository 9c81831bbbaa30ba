//! ssh-rotate rotate - Replace the shared key on every listed host

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use console::{Term, style};
use dialoguer::Confirm;
use ssh_rotate_core::host::{HostListError, connection_routes, load_host_list};
use ssh_rotate_core::keys::{KeyError, KeyParams};
use ssh_rotate_core::rotation::alias_entries;
use ssh_rotate_core::{
    BatchSummary, Config, HostRecord, KeyStore, OldCredential, OpenSshTransport, Rotation,
    Settings, load_old_credential, update_ssh_config,
};

use super::settings::SettingsArgs;
use crate::output::{BatchProgress, format_lockout_warning, format_summary, plan_table};

/// Arguments for the rotate command
#[derive(Args)]
pub struct RotateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan and exit without contacting any host
    #[arg(long)]
    pub dry_run: bool,
}

/// Everything checked before the first host is touched
struct Preflight {
    hosts: Vec<HostRecord>,
    old: OldCredential,
    key_store: KeyStore,
}

fn preflight(settings: &Settings) -> Result<Preflight> {
    let hosts = load_host_list(&settings.hosts_file, &settings.default_user)
        .map_err(|e| host_list_error(e, &settings.hosts_file))?;

    let old = load_old_credential(&settings.old_key)
        .map_err(|e| old_key_error(e, &settings.old_key))?;

    let key_store = KeyStore::new(
        settings.key_dir.clone(),
        settings.key_type,
        KeyParams {
            bits: settings.key_bits,
        },
    )?;

    Ok(Preflight {
        hosts,
        old,
        key_store,
    })
}

fn host_list_error(err: HostListError, path: &Path) -> anyhow::Error {
    match err {
        HostListError::NotFound(_) => anyhow::anyhow!(
            "Host list not found: {}\n\n\
            Create it with one host per line:\n  \
            ADDRESS [ALIAS] [USER]\n\n\
            Or point to another file:\n  \
            ssh-rotate rotate --hosts <path>",
            path.display()
        ),
        HostListError::Empty => anyhow::anyhow!(
            "Host list {} contains no hosts.\n\n\
            Blank lines and lines starting with # are ignored.",
            path.display()
        ),
        other => anyhow::Error::new(other).context(format!("Invalid host list {}", path.display())),
    }
}

fn old_key_error(err: KeyError, path: &Path) -> anyhow::Error {
    match err {
        KeyError::MissingCredential(missing) => anyhow::anyhow!(
            "Old key not found: {}\n\n\
            The key currently installed on every host must exist locally,\n\
            together with its .pub file.\n\n\
            Point to it with:\n  \
            ssh-rotate rotate --old-key <path>",
            missing.display()
        ),
        other => anyhow::Error::new(other).context(format!("Unusable old key {}", path.display())),
    }
}

/// The plan is shown unless quiet, but always for a dry run or a prompt
fn should_show_plan(quiet: bool, dry_run: bool, will_prompt: bool) -> bool {
    !quiet || dry_run || will_prompt
}

/// Decide whether to go ahead
///
/// `--yes` skips the prompt. Without it a terminal is required, since there
/// is nobody to answer otherwise.
fn confirm_gate(yes: bool, interactive: bool, prompt: impl FnOnce() -> Result<bool>) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !interactive {
        bail!(
            "No TTY detected and --yes not given.\n\n\
            Rotation changes authorized_keys on every listed host.\n\
            Review the plan with --dry-run, then run again with --yes."
        );
    }
    prompt()
}

fn prompt_confirm(count: usize) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("Rotate keys on {count} host(s)?"))
        .default(false)
        .interact()
        .map_err(|_| {
            // Restore cursor in case it was hidden
            let _ = Term::stdout().show_cursor();
            anyhow::anyhow!("Rotation cancelled")
        })
}

pub async fn cmd_rotate(args: &RotateArgs, config: &Config, quiet: bool) -> Result<()> {
    let settings = args.settings.resolve(config)?;
    let Preflight {
        hosts,
        old,
        key_store,
    } = preflight(&settings)?;

    let interactive = std::io::stdin().is_terminal();
    let will_prompt = !args.yes && interactive;

    if should_show_plan(quiet, args.dry_run, will_prompt) {
        println!("{}", plan_table(&hosts, &key_store));
        println!();
        println!(
            "{} {}  {} {}",
            style("Old key:").dim(),
            old.private_path.display(),
            style("SSH config:").dim(),
            settings.ssh_config.display()
        );
        println!();
    }

    if args.dry_run {
        println!("Dry run: no keys generated and no host contacted.");
        return Ok(());
    }

    if !confirm_gate(args.yes, interactive, || prompt_confirm(hosts.len()))? {
        if !quiet {
            println!("Aborted. Nothing was changed.");
        }
        return Ok(());
    }

    let transport = OpenSshTransport::new(Duration::from_secs(settings.connect_timeout))
        .with_routes(connection_routes(&settings.ssh_config, &hosts));
    let rotation = Rotation::new(&key_store, &old).with_jobs(settings.jobs);
    let progress = BatchProgress::new_maybe(hosts.len(), quiet);

    let outcomes = rotation
        .run_batch(&transport, &hosts, &|event| progress.on_event(event))
        .await;
    progress.finish();

    let summary = BatchSummary::from_outcomes(&outcomes);
    let warning = format_lockout_warning(&summary);
    let update = update_ssh_config(&settings.ssh_config, &alias_entries(&outcomes));

    if let Ok(update) = &update {
        if !quiet {
            println!();
            println!("{}", format_summary(&summary, update));
        }
    }
    if !warning.is_empty() {
        eprintln!();
        eprintln!("{warning}");
    }

    // Keys are already rotated at this point; only the aliases are missing
    update.with_context(|| {
        format!(
            "Failed to update {}. Rotated keys are in {}",
            settings.ssh_config.display(),
            key_store.dir().display()
        )
    })?;

    Ok(())
}
