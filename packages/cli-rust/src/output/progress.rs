//! Batch progress bar with per-host result lines
//!
//! Shows how many hosts are done while the batch runs and prints one line
//! per host as it finishes. Becomes a no-op in quiet mode.

use indicatif::{ProgressBar, ProgressStyle};
use ssh_rotate_core::{RotationEvent, RotationOutcome};
use std::time::Duration;

use super::colors::{outcome_mark, outcome_style};

/// Progress display for a rotation batch
///
/// # Example
///
/// ```ignore
/// let progress = BatchProgress::new_maybe(hosts.len(), quiet);
/// let outcomes = rotation.run_batch(&transport, &hosts, &|e| progress.on_event(e)).await;
/// progress.finish();
/// ```
pub struct BatchProgress {
    bar: Option<ProgressBar>,
}

impl BatchProgress {
    /// Create a progress bar for `total` hosts
    ///
    /// Shows: `spinner [done/total] message (MM:SS)`
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{pos}/{len}] {msg} ({elapsed_precise:.dim})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("\u{28CB}\u{2819}\u{2839}\u{2838}\u{283C}\u{2834}\u{2826}\u{2827}\u{2807}\u{280F}");
        bar.set_style(style);
        bar.set_message("Rotating keys...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Create a progress bar that respects quiet mode
    pub fn new_maybe(total: usize, quiet: bool) -> Self {
        if quiet {
            Self { bar: None }
        } else {
            Self::new(total)
        }
    }

    /// Update the display for one rotation event
    pub fn on_event(&self, event: RotationEvent<'_>) {
        let Some(bar) = &self.bar else {
            return;
        };

        match event {
            RotationEvent::Started(host) => bar.set_message(format!("{}: preparing key", host.alias())),
            RotationEvent::KeyReady(host, _) => {
                bar.set_message(format!("{}: installing new key", host.alias()))
            }
            RotationEvent::Mutated(host, _) => {
                bar.set_message(format!("{}: verifying new key", host.alias()))
            }
            RotationEvent::Finished(outcome) => {
                bar.println(outcome_line(outcome));
                bar.inc(1);
            }
        }
    }

    /// Remove the bar, leaving the per-host lines
    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// One result line, e.g. `✓ dbserver (admin@10.0.0.5) rotated`
pub fn outcome_line(outcome: &RotationOutcome) -> String {
    let mut line = format!(
        "{} {} ({}) {}",
        outcome_mark(outcome),
        outcome.host.alias(),
        outcome.host.destination(),
        outcome_style(outcome)
    );
    if let Some(reason) = outcome.failure() {
        line.push_str(&format!(": {}", reason.detail()));
    }
    line
}
