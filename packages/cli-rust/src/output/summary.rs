//! Plan and summary rendering for `ssh-rotate rotate`

use comfy_table::{Cell, Color, Table};
use console::style;
use ssh_rotate_core::host::SshConfigUpdate;
use ssh_rotate_core::{BatchSummary, HostRecord, KeyStore};

/// Table of what a run will do: one row per host
pub fn plan_table(hosts: &[HostRecord], key_store: &KeyStore) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Alias", "Address", "User", "Key file", "Key"]);

    for host in hosts {
        let private_path = key_store.private_path(host.alias());
        let key_state = if private_path.exists() {
            Cell::new("reuse").fg(Color::Yellow)
        } else {
            Cell::new("new").fg(Color::Green)
        };

        table.add_row(vec![
            Cell::new(host.alias()).fg(Color::Cyan),
            Cell::new(host.address()),
            Cell::new(host.user()),
            Cell::new(private_path.display()),
            key_state,
        ]);
    }

    table
}

/// Final report after the SSH config was written
pub fn format_summary(summary: &BatchSummary, update: &SshConfigUpdate) -> String {
    let mut out = Vec::new();

    out.push(format!(
        "{} {} of {} hosts rotated",
        style("Summary:").bold(),
        style(summary.succeeded.len()).green().bold(),
        summary.total
    ));
    if !summary.succeeded.is_empty() {
        out.push(format!("  Aliases: {}", summary.succeeded.join(", ")));
    }

    if !summary.old_key_retained.is_empty() {
        out.push(String::new());
        out.push(format!(
            "{} old key still trusted on {}",
            style("Warning:").yellow().bold(),
            summary.old_key_retained.join(", ")
        ));
        out.push(
            "  Its authorized_keys entry differs from the old .pub line (options or comment)"
                .to_string(),
        );
        out.push("  and was left in place. Remove it by hand.".to_string());
    }

    if !summary.failed.is_empty() {
        out.push(String::new());
        out.push(format!(
            "{} {} host(s) failed:",
            style("Failed:").red().bold(),
            summary.failed.len()
        ));
        for failed in &summary.failed {
            out.push(format!("  {} {}: {}", style("\u{2717}").red(), failed.host, failed.reason));
        }
    }

    out.push(String::new());
    out.push(format!(
        "{} {} alias(es) in {}",
        style("SSH config:").cyan(),
        update.written,
        update.path.display()
    ));
    match &update.backup {
        Some(backup) => out.push(format!("  Backup: {}", backup.display())),
        None => out.push("  Backup: (new file, nothing to back up)".to_string()),
    }
    for alias in &update.shadowed {
        out.push(format!(
            "  {} '{}' is also defined earlier in the file; that entry takes precedence.",
            style("Note:").yellow(),
            alias
        ));
    }

    out.join("\n")
}

/// Warning block for hosts whose old key may be gone while the new key
/// does not work; empty when there are none
pub fn format_lockout_warning(summary: &BatchSummary) -> String {
    let at_risk: Vec<_> = summary.lockout_risk().collect();
    if at_risk.is_empty() {
        return String::new();
    }

    let mut out = vec![
        format!(
            "{} {} host(s) may be unreachable with both keys",
            style("WARNING:").red().bold().reverse(),
            at_risk.len()
        ),
        String::new(),
    ];
    for failed in at_risk {
        out.push(format!("  {} {}", style("!").red().bold(), failed.host));
        out.push(format!("      {}", failed.reason));
    }
    out.push(String::new());
    out.push(format!(
        "  {} Keep an existing session open or use console access to check",
        style("Tip:").cyan()
    ));
    out.push("       ~/.ssh/authorized_keys on these hosts before retrying.".to_string());

    out.join("\n")
}
