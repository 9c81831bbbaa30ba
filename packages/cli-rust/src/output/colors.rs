//! Color utilities for CLI output
//!
//! Provides consistent styling for per-host rotation results.

use console::{Style, StyledObject};
use ssh_rotate_core::RotationOutcome;

/// Status word for one outcome
///
/// - rotated -> green bold
/// - old key still trusted -> yellow bold
/// - failed -> red
/// - lockout risk -> red bold, reversed
pub fn outcome_style(outcome: &RotationOutcome) -> StyledObject<&'static str> {
    match outcome.failure() {
        Some(reason) if reason.is_lockout_risk() => {
            Style::new().red().bold().reverse().apply_to("LOCKOUT RISK")
        }
        Some(_) => Style::new().red().apply_to("failed"),
        None if outcome.old_key_retained() => {
            Style::new().yellow().bold().apply_to("rotated, old key still trusted")
        }
        None => Style::new().green().bold().apply_to("rotated"),
    }
}

/// Check or cross mark for one outcome
pub fn outcome_mark(outcome: &RotationOutcome) -> StyledObject<&'static str> {
    if outcome.is_success() {
        Style::new().green().apply_to("\u{2713}")
    } else {
        Style::new().red().apply_to("\u{2717}")
    }
}
