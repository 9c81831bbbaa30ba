//! Key material error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while generating or loading key material
#[derive(Error, Debug)]
pub enum KeyError {
    /// Failed to read a key file from disk
    #[error("Failed to read key from {}: {source}", .path.display())]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse an existing private key
    #[error("Failed to parse key from {}: {source}", .path.display())]
    ParseKey {
        path: PathBuf,
        #[source]
        source: ssh_key::Error,
    },

    /// Key generation failed
    #[error("Failed to generate key: {0}")]
    GenerateKey(#[source] ssh_key::Error),

    /// Key could not be encoded in OpenSSH format
    #[error("Failed to serialize key: {0}")]
    SerializeKey(#[source] ssh_key::Error),

    /// Failed to write a key file
    #[error("Failed to write key to {}: {source}", .path.display())]
    WriteKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the key directory
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to restrict file permissions
    #[error("Failed to set permissions on {}: {source}", .path.display())]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Old credential (private key or its `.pub`) is missing
    #[error("Old credential not found: {}", .0.display())]
    MissingCredential(PathBuf),

    /// Public key file does not hold a single OpenSSH public key line
    #[error("Invalid public key in {}: {reason}", .path.display())]
    InvalidPublicKey { path: PathBuf, reason: String },

    /// RSA bit length outside the supported range
    #[error("Unsupported RSA key size {0} (expected 2048-16384 bits)")]
    UnsupportedKeySize(usize),
}
