//! In-memory transport for rotation tests
//!
//! Each fake host owns an [`AuthorizedKeys`]. A session authenticates only if
//! some line of that file carries the offered identity's public key, which
//! makes the old-key / new-key hand-over observable without a network.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::host::{HostRecord, RemoteOp, SessionError, SessionOutput, SessionTransport};
use crate::keys::OldCredential;

use super::authorized_keys::{AuthorizedKeys, script_output};

/// Failure injected into a fake host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every session fails to connect
    Unreachable,
    /// The key swap exits non-zero without touching the file
    ReadOnlyHome,
    /// The key swap works but the new key is never accepted
    RejectNewKey,
}

#[derive(Debug, Default)]
struct FakeHost {
    keys: AuthorizedKeys,
    fault: Option<Fault>,
}

#[derive(Debug)]
pub struct FakeTransport {
    old: OldCredential,
    hosts: Mutex<HashMap<String, FakeHost>>,
    sessions: AtomicUsize,
}

impl FakeTransport {
    pub fn new(old: &OldCredential) -> Self {
        Self {
            old: old.clone(),
            hosts: Mutex::new(HashMap::new()),
            sessions: AtomicUsize::new(0),
        }
    }

    /// Add a reachable host whose authorized_keys holds `content`
    pub fn with_host(self, host: &HostRecord, content: &str) -> Self {
        self.hosts.lock().unwrap().insert(
            host.address().to_string(),
            FakeHost {
                keys: AuthorizedKeys::parse(content),
                fault: None,
            },
        );
        self
    }

    pub fn with_fault(self, host: &HostRecord, fault: Fault) -> Self {
        self.set_fault(host, Some(fault));
        self
    }

    pub fn set_fault(&self, host: &HostRecord, fault: Option<Fault>) {
        if let Some(state) = self.hosts.lock().unwrap().get_mut(host.address()) {
            state.fault = fault;
        }
    }

    pub fn authorized_keys(&self, host: &HostRecord) -> AuthorizedKeys {
        self.hosts.lock().unwrap()[host.address()].keys.clone()
    }

    /// Sessions attempted so far, failed ones included
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    fn offered_key(&self, identity: &Path) -> Option<String> {
        if identity == self.old.private_path {
            return Some(self.old.public_key.clone());
        }
        let mut public = identity.as_os_str().to_owned();
        public.push(".pub");
        std::fs::read_to_string(PathBuf::from(public))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl SessionTransport for FakeTransport {
    async fn execute(
        &self,
        host: &HostRecord,
        identity: &Path,
        op: &RemoteOp,
    ) -> Result<SessionOutput, SessionError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let offered = self.offered_key(identity);

        let mut hosts = self.hosts.lock().unwrap();
        let state = hosts.get_mut(host.address()).ok_or_else(|| {
            SessionError::ConnectionFailed(format!("Could not resolve hostname {}", host.address()))
        })?;

        if state.fault == Some(Fault::Unreachable) {
            return Err(SessionError::ConnectionFailed(format!(
                "connect to host {} port 22: Connection timed out",
                host.address()
            )));
        }

        let rejected = || SessionError::AuthFailed {
            identity: identity.to_path_buf(),
        };
        let offered = offered.ok_or_else(rejected)?;
        if !state.keys.authorizes(&offered) {
            return Err(rejected());
        }

        match op {
            RemoteOp::AddAndRemoveKey { new_key, old_key } => {
                if state.fault == Some(Fault::ReadOnlyHome) {
                    return Err(SessionError::Remote {
                        code: 1,
                        stderr: "touch: cannot touch '.ssh/authorized_keys': Read-only file system"
                            .to_string(),
                    });
                }
                let report = state
                    .keys
                    .rotate(new_key, old_key)
                    .map_err(|stderr| SessionError::Remote { code: 3, stderr })?;
                Ok(SessionOutput {
                    stdout: script_output(&report),
                    stderr: String::new(),
                })
            }
            RemoteOp::Probe => {
                if state.fault == Some(Fault::RejectNewKey) && offered != self.old.public_key {
                    return Err(rejected());
                }
                Ok(SessionOutput::default())
            }
        }
    }
}
