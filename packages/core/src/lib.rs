//! ssh-rotate-core - Core library for ssh-rotate
//!
//! Replaces a single SSH key shared by many hosts with one key per host.
//! This crate holds everything except the terminal front end: host list
//! loading, key generation, the remote key swap and the SSH config block.

pub mod config;
pub mod host;
pub mod keys;
pub mod rotation;
pub mod version;

// Re-export the types a front end needs for a full run
pub use config::{Config, Settings, load_config};
pub use host::{HostRecord, OpenSshTransport, SessionTransport, update_ssh_config};
pub use keys::{KeyStore, KeyType, OldCredential, load_old_credential};
pub use rotation::{BatchSummary, Rotation, RotationEvent, RotationOutcome};
pub use version::{get_version, get_version_long};
