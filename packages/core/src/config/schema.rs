//! Configuration schema for ssh-rotate
//!
//! Defines the structure and defaults for the config.json file and the
//! resolved settings a run works from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::expand_tilde;
use crate::host::{DEFAULT_CONNECT_TIMEOUT_SECS, default_user};
use crate::keys::{DEFAULT_RSA_BITS, KeyType, MAX_RSA_BITS, MIN_RSA_BITS};

/// Main configuration structure for ssh-rotate
///
/// Serialized to/from `~/.config/ssh-rotate/config.json`. Path values may
/// start with `~/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Config file version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Shared private key currently trusted by every host
    #[serde(default = "default_old_key")]
    pub old_key: String,

    /// Login user for host list lines without one (default: current user)
    #[serde(default)]
    pub default_user: Option<String>,

    /// Algorithm for new keys (default: "ed25519")
    #[serde(default)]
    pub key_type: KeyType,

    /// Modulus size for RSA keys (default: 4096)
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,

    /// Directory new keypairs are written to
    #[serde(default = "default_key_dir")]
    pub key_dir: String,

    /// Host list, relative to the working directory unless absolute
    #[serde(default = "default_hosts_file")]
    pub hosts_file: String,

    /// OpenSSH client config holding the managed alias block
    #[serde(default = "default_ssh_config")]
    pub ssh_config: String,

    /// SSH connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Hosts rotated at the same time (default: 1)
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_version() -> u32 {
    1
}

fn default_old_key() -> String {
    "~/.ssh/id_rsa".to_string()
}

fn default_key_bits() -> usize {
    DEFAULT_RSA_BITS
}

fn default_key_dir() -> String {
    "~/.ssh/rotated".to_string()
}

fn default_hosts_file() -> String {
    "hosts.txt".to_string()
}

fn default_ssh_config() -> String {
    "~/.ssh/config".to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_jobs() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            old_key: default_old_key(),
            default_user: None,
            key_type: KeyType::default(),
            key_bits: default_key_bits(),
            key_dir: default_key_dir(),
            hosts_file: default_hosts_file(),
            ssh_config: default_ssh_config(),
            connect_timeout: default_connect_timeout(),
            jobs: default_jobs(),
        }
    }
}

impl Config {
    /// Expand paths and fill in the default user
    pub fn resolve(&self) -> Settings {
        Settings {
            old_key: expand_tilde(&self.old_key),
            default_user: self.default_user.clone().unwrap_or_else(default_user),
            key_type: self.key_type,
            key_bits: self.key_bits,
            key_dir: expand_tilde(&self.key_dir),
            hosts_file: expand_tilde(&self.hosts_file),
            ssh_config: expand_tilde(&self.ssh_config),
            connect_timeout: self.connect_timeout,
            jobs: self.jobs,
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Settings {
    pub old_key: PathBuf,
    pub default_user: String,
    pub key_type: KeyType,
    pub key_bits: usize,
    pub key_dir: PathBuf,
    pub hosts_file: PathBuf,
    pub ssh_config: PathBuf,
    pub connect_timeout: u64,
    pub jobs: usize,
}

impl Settings {
    /// Reject values no run could work with
    ///
    /// `default_user` is checked by the host list loader, and only for lines
    /// that fall back to it.
    pub fn validate(&self) -> Result<(), String> {
        if self.key_type == KeyType::Rsa && !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&self.key_bits)
        {
            return Err(format!(
                "key_bits must be between {MIN_RSA_BITS} and {MAX_RSA_BITS}, got {}",
                self.key_bits
            ));
        }
        if self.jobs == 0 {
            return Err("jobs must be at least 1".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be at least 1 second".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.old_key, "~/.ssh/id_rsa");
        assert_eq!(config.default_user, None);
        assert_eq!(config.key_type, KeyType::Ed25519);
        assert_eq!(config.key_bits, 4096);
        assert_eq!(config.key_dir, "~/.ssh/rotated");
        assert_eq!(config.hosts_file, "hosts.txt");
        assert_eq!(config.ssh_config, "~/.ssh/config");
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let config: Config =
            serde_json::from_str(r#"{"key_type": "rsa", "jobs": 4}"#).unwrap();
        assert_eq!(config.key_type, KeyType::Rsa);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.old_key, "~/.ssh/id_rsa");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let config = Config {
            default_user: Some("admin".to_string()),
            key_type: KeyType::Rsa,
            key_bits: 3072,
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"old_keys": "~/.ssh/x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unknown_key_type() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"key_type": "dsa"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_expands_paths() {
        let config = Config {
            default_user: Some("deploy".to_string()),
            hosts_file: "/etc/ssh-rotate/hosts.txt".to_string(),
            ..Config::default()
        };
        let settings = config.resolve();

        let home = dirs::home_dir().unwrap();
        assert_eq!(settings.old_key, home.join(".ssh/id_rsa"));
        assert_eq!(settings.key_dir, home.join(".ssh/rotated"));
        assert_eq!(settings.hosts_file, PathBuf::from("/etc/ssh-rotate/hosts.txt"));
        assert_eq!(settings.default_user, "deploy");
    }

    #[test]
    fn test_resolve_falls_back_to_login_user() {
        let settings = Config::default().resolve();
        assert!(!settings.default_user.is_empty());
    }

    #[test]
    fn test_validate() {
        let valid = Config {
            default_user: Some("admin".to_string()),
            ..Config::default()
        }
        .resolve();
        assert!(valid.validate().is_ok());

        let bits = Settings {
            key_type: KeyType::Rsa,
            key_bits: 1024,
            ..valid.clone()
        };
        assert!(bits.validate().unwrap_err().contains("key_bits"));

        // Key size is meaningless for ed25519
        let ed25519_bits = Settings {
            key_type: KeyType::Ed25519,
            key_bits: 0,
            ..valid.clone()
        };
        assert!(ed25519_bits.validate().is_ok());

        let jobs = Settings {
            jobs: 0,
            ..valid.clone()
        };
        assert!(jobs.validate().unwrap_err().contains("jobs"));

        let timeout = Settings {
            connect_timeout: 0,
            ..valid.clone()
        };
        assert!(timeout.validate().unwrap_err().contains("connect_timeout"));

        // An odd login name only matters once a host line relies on it
        let user = Settings {
            default_user: "CORP\\jdoe".to_string(),
            ..valid
        };
        assert!(user.validate().is_ok());
    }
}
