//! Command-line and environment overrides for the config file
//!
//! Each flag has an `SSH_ROTATE_*` environment variable. A flag beats its
//! variable, and both beat the config file.

use anyhow::{Result, anyhow};
use clap::Args;
use ssh_rotate_core::keys::KeyType;
use ssh_rotate_core::{Config, Settings};

/// Overrides shared by every command that needs resolved settings
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Private key currently installed on every host
    #[arg(long, env = "SSH_ROTATE_OLD_KEY", value_name = "PATH")]
    pub old_key: Option<String>,

    /// Login user for host lines that do not name one
    #[arg(short = 'u', long = "user", env = "SSH_ROTATE_USER", value_name = "USER")]
    pub default_user: Option<String>,

    /// Algorithm for new keys: ed25519 or rsa
    #[arg(long, env = "SSH_ROTATE_KEY_TYPE", value_name = "TYPE")]
    pub key_type: Option<KeyType>,

    /// RSA key size in bits
    #[arg(long, env = "SSH_ROTATE_KEY_BITS", value_name = "BITS")]
    pub key_bits: Option<usize>,

    /// Directory for generated keypairs
    #[arg(long, env = "SSH_ROTATE_KEY_DIR", value_name = "DIR")]
    pub key_dir: Option<String>,

    /// Host list file (ADDRESS [ALIAS] [USER] per line)
    #[arg(long = "hosts", env = "SSH_ROTATE_HOSTS", value_name = "PATH")]
    pub hosts_file: Option<String>,

    /// OpenSSH client config to write aliases into
    #[arg(long, env = "SSH_ROTATE_SSH_CONFIG", value_name = "PATH")]
    pub ssh_config: Option<String>,

    /// SSH connect timeout in seconds
    #[arg(long, env = "SSH_ROTATE_CONNECT_TIMEOUT", value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Hosts to rotate at the same time
    #[arg(short, long, env = "SSH_ROTATE_JOBS", value_name = "N")]
    pub jobs: Option<usize>,
}

impl SettingsArgs {
    /// Layer these overrides onto `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(v) = &self.old_key {
            config.old_key = v.clone();
        }
        if let Some(v) = &self.default_user {
            config.default_user = Some(v.clone());
        }
        if let Some(v) = self.key_type {
            config.key_type = v;
        }
        if let Some(v) = self.key_bits {
            config.key_bits = v;
        }
        if let Some(v) = &self.key_dir {
            config.key_dir = v.clone();
        }
        if let Some(v) = &self.hosts_file {
            config.hosts_file = v.clone();
        }
        if let Some(v) = &self.ssh_config {
            config.ssh_config = v.clone();
        }
        if let Some(v) = self.connect_timeout {
            config.connect_timeout = v;
        }
        if let Some(v) = self.jobs {
            config.jobs = v;
        }
    }

    /// Apply overrides, resolve paths and validate the result
    pub fn resolve(&self, config: &Config) -> Result<Settings> {
        let mut config = config.clone();
        self.apply(&mut config);

        let settings = config.resolve();
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {e}"))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let config = Config {
            jobs: 3,
            default_user: Some("admin".to_string()),
            ..Config::default()
        };
        let settings = SettingsArgs::default().resolve(&config).unwrap();
        assert_eq!(settings.jobs, 3);
        assert_eq!(settings.default_user, "admin");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = TestCli::try_parse_from([
            "test",
            "--hosts",
            "/srv/fleet.txt",
            "--key-type",
            "rsa",
            "--key-bits",
            "3072",
            "-u",
            "deploy",
            "-j",
            "8",
        ])
        .unwrap();
        let config = Config {
            jobs: 2,
            ..Config::default()
        };

        let settings = cli.settings.resolve(&config).unwrap();
        assert_eq!(settings.hosts_file, PathBuf::from("/srv/fleet.txt"));
        assert_eq!(settings.key_type, KeyType::Rsa);
        assert_eq!(settings.key_bits, 3072);
        assert_eq!(settings.default_user, "deploy");
        assert_eq!(settings.jobs, 8);
    }

    #[test]
    fn test_unknown_key_type_is_rejected() {
        assert!(TestCli::try_parse_from(["test", "--key-type", "dsa"]).is_err());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let args = SettingsArgs {
            jobs: Some(0),
            default_user: Some("admin".to_string()),
            ..Default::default()
        };
        let err = args.resolve(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("jobs"));
    }
}
