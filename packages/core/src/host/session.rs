//! Remote sessions over the system SSH client
//!
//! Every remote action is a typed [`RemoteOp`]. The shell program behind each
//! operation is a constant; key material travels on the session's stdin, so
//! nothing from the host list or key files is ever spliced into a command line.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::SessionError;
use super::schema::HostRecord;

/// Default `ConnectTimeout` passed to ssh, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Time allowed for the remote command once connected
const SESSION_GRACE: Duration = Duration::from_secs(30);

/// Exit status ssh itself uses for connection and auth failures
const SSH_ERROR_STATUS: i32 = 255;

/// Installs the new key and then drops the old one, in one session.
///
/// Reads the new key line then the old key line from stdin. The new key is
/// appended only if no identical line exists, and the old key lines are
/// filtered out in a single rewrite that happens after the new line is
/// confirmed present. Prints `new-key: added|present` and
/// `old-key: removed|absent` for the caller. Contains no single quotes so it
/// can be wrapped in `sh -c '...'` for any login shell.
const ADD_AND_REMOVE_SCRIPT: &str = concat!(
    "set -e; umask 077; ",
    "IFS= read -r new_key; IFS= read -r old_key; ",
    "test -n \"$new_key\"; test -n \"$old_key\"; ",
    "mkdir -p \"$HOME/.ssh\"; chmod 700 \"$HOME/.ssh\"; ",
    "ak=\"$HOME/.ssh/authorized_keys\"; touch \"$ak\"; chmod 600 \"$ak\"; ",
    "if [ -s \"$ak\" ] && [ -n \"$(tail -c 1 \"$ak\")\" ]; then echo >> \"$ak\"; fi; ",
    "if grep -qxF -- \"$new_key\" \"$ak\"; then echo \"new-key: present\"; ",
    "else echo \"$new_key\" >> \"$ak\"; echo \"new-key: added\"; fi; ",
    "grep -qxF -- \"$new_key\" \"$ak\"; ",
    "if grep -qxF -- \"$old_key\" \"$ak\"; then ",
    "tmp=$(mktemp \"$ak.XXXXXX\"); ",
    "grep -vxF -- \"$old_key\" \"$ak\" > \"$tmp\" || [ $? -eq 1 ]; ",
    "if ! grep -qxF -- \"$new_key\" \"$tmp\"; then rm -f \"$tmp\"; exit 3; fi; ",
    "chmod 600 \"$tmp\"; mv -f \"$tmp\" \"$ak\"; echo \"old-key: removed\"; ",
    "else echo \"old-key: absent\"; fi",
);

/// Trivial command proving a session can be established
const PROBE_SCRIPT: &str = "true";

/// A typed remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// Insert `new_key` if absent, then delete every line equal to `old_key`
    AddAndRemoveKey { new_key: String, old_key: String },
    /// Run a no-op to prove the offered identity is accepted
    Probe,
}

impl RemoteOp {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::AddAndRemoveKey { .. } => "add-and-remove-key",
            RemoteOp::Probe => "probe",
        }
    }

    /// Remote command line, identical for every host
    pub fn remote_command(&self) -> String {
        match self {
            RemoteOp::AddAndRemoveKey { .. } => format!("sh -c '{ADD_AND_REMOVE_SCRIPT}'"),
            RemoteOp::Probe => PROBE_SCRIPT.to_string(),
        }
    }

    /// Data written to the session's stdin, if any
    pub fn stdin_payload(&self) -> Option<String> {
        match self {
            RemoteOp::AddAndRemoveKey { new_key, old_key } => {
                Some(format!("{}\n{}\n", new_key.trim(), old_key.trim()))
            }
            RemoteOp::Probe => None,
        }
    }
}

/// Captured output of a successful session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs remote operations against a host with a given identity
///
/// Implementations must not offer any identity other than `identity`.
pub trait SessionTransport: Sync {
    fn execute(
        &self,
        host: &HostRecord,
        identity: &Path,
        op: &RemoteOp,
    ) -> impl Future<Output = Result<SessionOutput, SessionError>> + Send;
}

/// How to reach a host, carried over from the user's SSH config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRoute {
    pub port: Option<u16>,
    /// Comma separated jump hosts, as `-J` takes them
    pub proxy_jump: Option<String>,
}

impl HostRoute {
    pub fn is_empty(&self) -> bool {
        self.port.is_none() && self.proxy_jump.is_none()
    }
}

/// Transport backed by the OpenSSH `ssh` binary
///
/// Sessions run with `-F none`: no client config is read, so the only key
/// ever offered is the one passed in. Port and ProxyJump can be supplied per
/// host address with [`with_routes`](Self::with_routes).
#[derive(Debug, Clone)]
pub struct OpenSshTransport {
    program: PathBuf,
    connect_timeout: Duration,
    routes: HashMap<String, HostRoute>,
}

impl Default for OpenSshTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

impl OpenSshTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("ssh"),
            connect_timeout,
            routes: HashMap::new(),
        }
    }

    /// Per-address Port and ProxyJump, keyed by [`HostRecord::address`]
    pub fn with_routes(mut self, routes: HashMap<String, HostRoute>) -> Self {
        self.routes = routes;
        self
    }

    /// Use a different ssh binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Overall deadline for one session, connect included
    pub fn session_timeout(&self) -> Duration {
        self.connect_timeout + SESSION_GRACE
    }

    /// Build the ssh invocation for one operation
    fn build_command(&self, host: &HostRecord, identity: &Path, op: &RemoteOp) -> Command {
        let mut cmd = Command::new(&self.program);

        // No client config files, so no IdentityFile beyond -i
        cmd.arg("-F").arg("none");

        // No pseudo-terminal, no prompts
        cmd.arg("-T")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new");

        // Offer only the given key, even if an agent holds others
        cmd.arg("-o").arg("IdentitiesOnly=yes");
        cmd.arg("-i").arg(identity);

        if let Some(route) = self.routes.get(host.address()) {
            if let Some(port) = route.port {
                cmd.arg("-p").arg(port.to_string());
            }
            if let Some(jump) = &route.proxy_jump {
                cmd.arg("-J").arg(jump);
            }
        }

        cmd.arg(host.destination());
        cmd.arg(op.remote_command());

        let stdin = if op.stdin_payload().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        cmd.stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}

impl SessionTransport for OpenSshTransport {
    async fn execute(
        &self,
        host: &HostRecord,
        identity: &Path,
        op: &RemoteOp,
    ) -> Result<SessionOutput, SessionError> {
        let mut cmd = self.build_command(host, identity, op);

        tracing::debug!(
            "Running {} on {} with {}",
            op.name(),
            host.destination(),
            identity.display()
        );

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SessionError::SshSpawn("SSH not found. Install OpenSSH client.".to_string())
            } else {
                SessionError::SshSpawn(e.to_string())
            }
        })?;

        let payload = op.stdin_payload();
        let session = async move {
            if let (Some(payload), Some(mut stdin)) = (payload, child.stdin.take()) {
                // A closed pipe surfaces as the exit status below
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!("Failed to write session input: {}", e);
                }
            }
            child.wait_with_output().await
        };

        let timeout = self.session_timeout();
        let output = tokio::time::timeout(timeout, session)
            .await
            .map_err(|_| SessionError::Timeout(timeout.as_secs()))?
            .map_err(|e| SessionError::SshSpawn(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(SessionOutput { stdout, stderr })
        } else {
            Err(classify_failure(output.status.code(), &stderr, identity))
        }
    }
}

/// Map a failed ssh exit into a session error
fn classify_failure(code: Option<i32>, stderr: &str, identity: &Path) -> SessionError {
    let stderr = stderr.trim().to_string();
    match code {
        Some(SSH_ERROR_STATUS) if stderr.contains("Permission denied") => {
            SessionError::AuthFailed {
                identity: identity.to_path_buf(),
            }
        }
        Some(SSH_ERROR_STATUS) => SessionError::ConnectionFailed(stderr),
        Some(code) => SessionError::Remote { code, stderr },
        None => SessionError::Remote {
            code: -1,
            stderr: if stderr.is_empty() {
                "terminated by signal".to_string()
            } else {
                stderr
            },
        },
    }
}
