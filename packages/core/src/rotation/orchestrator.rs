//! Per-host rotation protocol and batch driver
//!
//! Each host runs Prepare -> Connect-and-Mutate -> Verify and ends in exactly
//! one [`RotationOutcome`]. Hosts never share mutable state, so the batch
//! may run them with bounded concurrency without changing the result.

use std::collections::BTreeMap;

use futures_util::StreamExt;
use futures_util::stream;

use crate::host::{HostRecord, RemoteOp, SessionTransport};
use crate::keys::{KeyPair, KeyStore, OldCredential};

use super::outcome::{FailureReason, RotationOutcome};
use super::report::MutationReport;

/// Progress notifications emitted while a batch runs
#[derive(Debug, Clone, Copy)]
pub enum RotationEvent<'a> {
    Started(&'a HostRecord),
    KeyReady(&'a HostRecord, &'a KeyPair),
    Mutated(&'a HostRecord, Option<&'a MutationReport>),
    Finished(&'a RotationOutcome),
}

/// Inputs shared read-only by every host in a batch
#[derive(Debug, Clone, Copy)]
pub struct Rotation<'a> {
    pub key_store: &'a KeyStore,
    pub old: &'a OldCredential,
    /// Maximum hosts in flight; 1 means strictly sequential
    pub jobs: usize,
}

impl<'a> Rotation<'a> {
    pub fn new(key_store: &'a KeyStore, old: &'a OldCredential) -> Self {
        Self {
            key_store,
            old,
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Rotate every host and return one outcome per host, in input order
    ///
    /// A failure on one host never stops or alters the others.
    pub async fn run_batch<T, F>(
        &self,
        transport: &T,
        hosts: &[HostRecord],
        on_event: &F,
    ) -> Vec<RotationOutcome>
    where
        T: SessionTransport,
        F: Fn(RotationEvent<'_>) + Sync,
    {
        tracing::info!("Rotating {} hosts ({} at a time)", hosts.len(), self.jobs);

        let outcomes: BTreeMap<usize, RotationOutcome> = stream::iter(hosts.iter().enumerate())
            .map(|(index, host)| async move {
                let outcome = self.rotate_host(transport, host, on_event).await;
                on_event(RotationEvent::Finished(&outcome));
                (index, outcome)
            })
            .buffer_unordered(self.jobs.max(1))
            .collect()
            .await;

        outcomes.into_values().collect()
    }

    /// Run the full protocol for one host
    pub async fn rotate_host<T, F>(
        &self,
        transport: &T,
        host: &HostRecord,
        on_event: &F,
    ) -> RotationOutcome
    where
        T: SessionTransport,
        F: Fn(RotationEvent<'_>) + Sync,
    {
        on_event(RotationEvent::Started(host));

        // Prepare
        let key_pair = match self.prepare(host).await {
            Ok(pair) => pair,
            Err(reason) => return self.fail(host, reason),
        };
        on_event(RotationEvent::KeyReady(host, &key_pair));

        if same_key(&key_pair.public_key, &self.old.public_key) {
            return self.fail(
                host,
                FailureReason::ConnectOrMutate(
                    "new key is identical to the old credential".to_string(),
                ),
            );
        }

        // Connect-and-Mutate, authenticated with the old key
        let op = RemoteOp::AddAndRemoveKey {
            new_key: key_pair.public_key.clone(),
            old_key: self.old.public_key.clone(),
        };
        let report = match transport.execute(host, &self.old.private_path, &op).await {
            Ok(output) => {
                let report = MutationReport::parse(&output.stdout);
                if report.is_none() {
                    tracing::warn!(
                        "Key swap on {} succeeded but reported no status",
                        host.alias()
                    );
                }
                report
            }
            Err(e) => return self.fail(host, FailureReason::ConnectOrMutate(e.to_string())),
        };
        tracing::info!("Key swap on {} complete", host.alias());
        on_event(RotationEvent::Mutated(host, report.as_ref()));

        // Verify, offering only the new key
        if let Err(e) = transport
            .execute(host, &key_pair.private_path, &RemoteOp::Probe)
            .await
        {
            tracing::warn!(
                "New key rejected by {} after the old key was removed: {}",
                host.alias(),
                e
            );
            return self.fail(host, FailureReason::VerificationFailed(e.to_string()));
        }

        tracing::info!("Verified new key on {}", host.alias());
        if report.is_some_and(|r| r.old_key_retained()) {
            tracing::warn!(
                "Old key is still accepted by {}; no line matched it exactly",
                host.alias()
            );
        }
        RotationOutcome::success(host.clone(), key_pair, report)
    }

    async fn prepare(&self, host: &HostRecord) -> Result<KeyPair, FailureReason> {
        let store = self.key_store.clone();
        let alias = host.alias().to_string();
        let comment = host.key_comment();

        // RSA generation is CPU bound; keep it off the async workers
        tokio::task::spawn_blocking(move || store.ensure_key_pair(&alias, &comment))
            .await
            .map_err(|e| FailureReason::KeyGeneration(e.to_string()))?
            .map_err(|e| FailureReason::KeyGeneration(e.to_string()))
    }

    fn fail(&self, host: &HostRecord, reason: FailureReason) -> RotationOutcome {
        tracing::info!("Rotation failed for {}: {}", host.alias(), reason);
        RotationOutcome::failed(host.clone(), reason)
    }
}

/// Compare the algorithm and key blob, ignoring comments
fn same_key(a: &str, b: &str) -> bool {
    key_blob(a) == key_blob(b)
}

fn key_blob(line: &str) -> Vec<&str> {
    line.split_whitespace().take(2).collect()
}
