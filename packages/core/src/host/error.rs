//! Host-specific error types
//!
//! Errors that can occur while loading the host list, talking to remote
//! hosts and rewriting the local SSH config.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a host list
#[derive(Error, Debug)]
pub enum HostListError {
    /// Host list file does not exist
    #[error("Host list not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Host list exists but could not be read
    #[error("Failed to read host list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed or failed token validation
    #[error("Line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    /// The same address appears twice
    #[error("Line {line}: duplicate address '{address}' (first seen on line {first})")]
    DuplicateAddress {
        line: usize,
        first: usize,
        address: String,
    },

    /// The same alias appears twice (aliases key the key files)
    #[error("Line {line}: duplicate alias '{alias}' (first seen on line {first})")]
    DuplicateAlias {
        line: usize,
        first: usize,
        alias: String,
    },

    /// No host records after skipping comments and blank lines
    #[error("Host list contains no hosts")]
    Empty,
}

/// Errors that can occur during a remote SSH session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to spawn the SSH client
    #[error("Failed to spawn SSH: {0}")]
    SshSpawn(String),

    /// Session did not finish within the deadline
    #[error("SSH session timed out after {0}s")]
    Timeout(u64),

    /// The offered identity was rejected
    #[error("SSH authentication failed with {}", .identity.display())]
    AuthFailed { identity: PathBuf },

    /// SSH could not reach or negotiate with the host
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote command ran but exited non-zero
    #[error("Remote command exited with status {code}: {stderr}")]
    Remote { code: i32, stderr: String },
}

/// Errors that can occur while rewriting the SSH config file
#[derive(Error, Debug)]
pub enum SshConfigError {
    /// Failed to read the existing config
    #[error("Failed to read SSH config: {0}")]
    Read(String),

    /// Failed to back up the existing config
    #[error("Failed to back up SSH config: {0}")]
    Backup(String),

    /// Failed to write the new config
    #[error("Failed to write SSH config: {0}")]
    Write(String),

    /// Managed block markers are unbalanced, reversed or repeated
    #[error("Malformed managed block in {}: {reason}", .path.display())]
    MalformedBlock { path: PathBuf, reason: String },
}
