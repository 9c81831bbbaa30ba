//! Per-host rotation results

use crate::host::{AliasEntry, HostRecord};
use crate::keys::KeyPair;

use super::report::MutationReport;

/// Why a host did not reach Success
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Local keypair could not be generated or loaded
    KeyGeneration(String),
    /// The old-key session could not connect or the key swap failed
    ConnectOrMutate(String),
    /// The key swap succeeded but the new key was rejected
    VerificationFailed(String),
}

impl FailureReason {
    /// The old key may already be gone while the new one does not work
    pub fn is_lockout_risk(&self) -> bool {
        matches!(self, FailureReason::VerificationFailed(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            FailureReason::KeyGeneration(d)
            | FailureReason::ConnectOrMutate(d)
            | FailureReason::VerificationFailed(d) => d,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::KeyGeneration(d) => write!(f, "key generation failed: {d}"),
            FailureReason::ConnectOrMutate(d) => write!(f, "connect/mutate error: {d}"),
            FailureReason::VerificationFailed(d) => {
                write!(f, "verification failed, old key state uncertain: {d}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStatus {
    Success {
        key_pair: KeyPair,
        /// None if the remote output could not be parsed
        report: Option<MutationReport>,
    },
    Failed(FailureReason),
}

/// Final result for one host; exactly one per host record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub host: HostRecord,
    pub status: RotationStatus,
}

impl RotationOutcome {
    pub fn success(host: HostRecord, key_pair: KeyPair, report: Option<MutationReport>) -> Self {
        Self {
            host,
            status: RotationStatus::Success { key_pair, report },
        }
    }

    pub fn failed(host: HostRecord, reason: FailureReason) -> Self {
        Self {
            host,
            status: RotationStatus::Failed(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RotationStatus::Success { .. })
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        match &self.status {
            RotationStatus::Success { key_pair, .. } => Some(key_pair),
            RotationStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            RotationStatus::Failed(reason) => Some(reason),
            RotationStatus::Success { .. } => None,
        }
    }

    /// Succeeded, but the host still accepts the old key as well
    pub fn old_key_retained(&self) -> bool {
        matches!(
            &self.status,
            RotationStatus::Success { report: Some(report), .. } if report.old_key_retained()
        )
    }

    /// SSH config alias for a successful host
    pub fn alias_entry(&self) -> Option<AliasEntry> {
        self.key_pair().map(|pair| AliasEntry {
            alias: self.host.alias().to_string(),
            host_name: self.host.address().to_string(),
            user: self.host.user().to_string(),
            identity_file: pair.private_path.clone(),
        })
    }
}

/// Alias entries for every successful outcome, in host list order
pub fn alias_entries(outcomes: &[RotationOutcome]) -> Vec<AliasEntry> {
    outcomes.iter().filter_map(RotationOutcome::alias_entry).collect()
}

/// A failed host as listed in the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedHost {
    pub host: String,
    pub reason: String,
    pub lockout_risk: bool,
}

/// Counts and host lists for the final report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: Vec<String>,
    /// Succeeded hosts that still accept the old key through another entry
    pub old_key_retained: Vec<String>,
    pub failed: Vec<FailedHost>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RotationOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match &outcome.status {
                RotationStatus::Success { .. } => {
                    summary.succeeded.push(outcome.host.alias().to_string());
                    if outcome.old_key_retained() {
                        summary.old_key_retained.push(outcome.host.alias().to_string());
                    }
                }
                RotationStatus::Failed(reason) => summary.failed.push(FailedHost {
                    host: outcome.host.to_string(),
                    reason: reason.to_string(),
                    lockout_risk: reason.is_lockout_risk(),
                }),
            }
        }

        summary
    }

    pub fn lockout_risk(&self) -> impl Iterator<Item = &FailedHost> {
        self.failed.iter().filter(|f| f.lockout_risk)
    }
}
