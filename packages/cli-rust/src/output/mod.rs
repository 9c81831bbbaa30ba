//! Output utilities for CLI commands
//!
//! Terminal output helpers: a batch progress bar with per-host result
//! lines, color styling for rotation outcomes, and the plan and summary
//! shown around a run.

pub mod colors;
pub mod progress;
pub mod summary;

pub use progress::BatchProgress;
pub use summary::{format_lockout_warning, format_summary, plan_table};
