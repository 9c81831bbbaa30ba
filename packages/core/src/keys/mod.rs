//! Key material management
//!
//! Generates one keypair per host alias under a key directory and loads the
//! shared old credential being retired. Generation is idempotent: an existing
//! private key at the deterministic path is always reused.

mod error;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ssh_key::private::{Ed25519Keypair, KeypairData, RsaKeypair};
use ssh_key::{LineEnding, PrivateKey};

pub use error::KeyError;

/// Smallest RSA modulus accepted
pub const MIN_RSA_BITS: usize = 2048;
/// Largest RSA modulus accepted
pub const MAX_RSA_BITS: usize = 16384;
/// RSA modulus used when none is configured
pub const DEFAULT_RSA_BITS: usize = 4096;

/// Algorithm for newly generated keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Ed25519,
    Rsa,
}

impl KeyType {
    /// Name used in key file names (`id_<name>_<alias>`)
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Rsa => "rsa",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "rsa" => Ok(KeyType::Rsa),
            other => Err(format!(
                "unsupported key type '{other}' (expected ed25519 or rsa)"
            )),
        }
    }
}

/// Parameters for variable-strength algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParams {
    /// RSA modulus size in bits, ignored for ed25519
    pub bits: usize,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            bits: DEFAULT_RSA_BITS,
        }
    }
}

/// A per-host keypair on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub alias: String,
    pub private_path: PathBuf,
    pub public_path: PathBuf,
    /// Single OpenSSH public key line, `<type> <base64> <comment>`
    pub public_key: String,
}

/// The shared key being retired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OldCredential {
    /// Private key offered to the mutate session
    pub private_path: PathBuf,
    /// Exact authorized_keys line removed from every host
    pub public_key: String,
}

impl OldCredential {
    pub fn new(private_path: impl Into<PathBuf>, public_key: impl Into<String>) -> Self {
        Self {
            private_path: private_path.into(),
            public_key: public_key.into(),
        }
    }
}

/// Deterministic keypair storage rooted at one directory
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    key_type: KeyType,
    params: KeyParams,
}

impl KeyStore {
    /// Create a key store, rejecting RSA sizes outside the supported range
    pub fn new(
        dir: impl Into<PathBuf>,
        key_type: KeyType,
        params: KeyParams,
    ) -> Result<Self, KeyError> {
        if key_type == KeyType::Rsa && !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&params.bits) {
            return Err(KeyError::UnsupportedKeySize(params.bits));
        }
        Ok(Self {
            dir: dir.into(),
            key_type,
            params,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Private key path for an alias: `<dir>/id_<type>_<alias>`
    pub fn private_path(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("id_{}_{}", self.key_type, alias))
    }

    /// Public key path for an alias: the private path plus `.pub`
    ///
    /// Built by appending, since aliases may themselves contain dots.
    pub fn public_path(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("id_{}_{}.pub", self.key_type, alias))
    }

    /// Return the keypair for `alias`, generating it only if absent
    ///
    /// An existing private key is reused unchanged. If only its `.pub` is
    /// missing, the public half is re-derived from the private key.
    pub fn ensure_key_pair(&self, alias: &str, comment: &str) -> Result<KeyPair, KeyError> {
        let private_path = self.private_path(alias);
        let public_path = self.public_path(alias);

        let public_key = if private_path.exists() {
            tracing::debug!("Reusing existing key {}", private_path.display());
            if public_path.exists() {
                read_public_key(&public_path)?
            } else {
                let private_key = load_private_key(&private_path)?;
                let public_key = private_key
                    .public_key()
                    .to_openssh()
                    .map_err(KeyError::SerializeKey)?;
                write_public_key(&public_path, &public_key)?;
                tracing::info!("Restored missing public key {}", public_path.display());
                public_key
            }
        } else {
            self.ensure_dir()?;
            let private_key = self.generate(comment)?;
            write_private_key(&private_path, &private_key)?;
            let public_key = private_key
                .public_key()
                .to_openssh()
                .map_err(KeyError::SerializeKey)?;
            write_public_key(&public_path, &public_key)?;
            tracing::info!(
                "Generated {} key for {} at {}",
                self.key_type,
                alias,
                private_path.display()
            );
            public_key
        };

        Ok(KeyPair {
            alias: alias.to_string(),
            private_path,
            public_path,
            public_key: public_key.trim().to_string(),
        })
    }

    fn generate(&self, comment: &str) -> Result<PrivateKey, KeyError> {
        let mut rng = rand::thread_rng();
        let key_data = match self.key_type {
            KeyType::Ed25519 => KeypairData::from(Ed25519Keypair::random(&mut rng)),
            KeyType::Rsa => KeypairData::from(
                RsaKeypair::random(&mut rng, self.params.bits).map_err(KeyError::GenerateKey)?,
            ),
        };
        PrivateKey::new(key_data, comment).map_err(KeyError::GenerateKey)
    }

    fn ensure_dir(&self) -> Result<(), KeyError> {
        if self.dir.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(|e| KeyError::CreateDirectory {
            path: self.dir.clone(),
            source: e,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700)).map_err(|e| {
                KeyError::SetPermissions {
                    path: self.dir.clone(),
                    source: e,
                }
            })?;
        }

        tracing::debug!("Created key directory {}", self.dir.display());
        Ok(())
    }
}

/// Load the old credential from a private key path
///
/// Both the private key and its `.pub` sibling must exist; the public file
/// must hold exactly one OpenSSH public key line.
pub fn load_old_credential(private_path: &Path) -> Result<OldCredential, KeyError> {
    if !private_path.exists() {
        return Err(KeyError::MissingCredential(private_path.to_path_buf()));
    }

    let mut public_path = private_path.as_os_str().to_owned();
    public_path.push(".pub");
    let public_path = PathBuf::from(public_path);
    if !public_path.exists() {
        return Err(KeyError::MissingCredential(public_path));
    }

    let public_key = read_public_key(&public_path)?;
    Ok(OldCredential::new(private_path, public_key))
}

fn read_public_key(path: &Path) -> Result<String, KeyError> {
    let contents = fs::read_to_string(path).map_err(|e| KeyError::ReadKey {
        path: path.to_path_buf(),
        source: e,
    })?;

    let invalid = |reason: &str| KeyError::InvalidPublicKey {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
    let line = lines.next().ok_or_else(|| invalid("file is empty"))?;
    if lines.next().is_some() {
        return Err(invalid("expected a single key line"));
    }
    if line.split_whitespace().count() < 2 {
        return Err(invalid("expected '<type> <base64> [comment]'"));
    }

    Ok(line.to_string())
}

fn load_private_key(path: &Path) -> Result<PrivateKey, KeyError> {
    let data = fs::read_to_string(path).map_err(|e| KeyError::ReadKey {
        path: path.to_path_buf(),
        source: e,
    })?;
    PrivateKey::from_openssh(&data).map_err(|e| KeyError::ParseKey {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_private_key(path: &Path, key: &PrivateKey) -> Result<(), KeyError> {
    let encoded = key.to_openssh(LineEnding::LF).map_err(KeyError::SerializeKey)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_err = |e| KeyError::WriteKey {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(encoded.as_bytes()).map_err(write_err)?;
    Ok(())
}

fn write_public_key(path: &Path, public_key: &str) -> Result<(), KeyError> {
    fs::write(path, format!("{}\n", public_key.trim())).map_err(|e| KeyError::WriteKey {
        path: path.to_path_buf(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|e| {
            KeyError::SetPermissions {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }

    Ok(())
}
