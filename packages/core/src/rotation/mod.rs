//! Rotation protocol
//!
//! Moves each host from trusting the shared old key to trusting its own new
//! key, verifying the new key before the host is reported as done.

mod orchestrator;
mod outcome;
mod report;

#[cfg(test)]
mod authorized_keys;
#[cfg(test)]
mod fake;

pub use orchestrator::{Rotation, RotationEvent};
pub use outcome::{
    BatchSummary, FailedHost, FailureReason, RotationOutcome, RotationStatus, alias_entries,
};
pub use report::MutationReport;
