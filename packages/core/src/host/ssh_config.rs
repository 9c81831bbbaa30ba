//! SSH config managed block
//!
//! Rewrites the region of `~/.ssh/config` between the ssh-rotate markers so
//! that it holds one `Host` stanza per rotated host. Everything outside the
//! markers is left byte for byte as it was.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ssh2_config::{ParseRule, SshConfig};

use super::error::SshConfigError;
use super::schema::HostRecord;
use super::session::HostRoute;

/// First line of the managed block
pub const BEGIN_MARKER: &str = "# BEGIN ssh-rotate managed block";
/// Last line of the managed block
pub const END_MARKER: &str = "# END ssh-rotate managed block";

/// One `Host` stanza in the managed block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: String,
    pub host_name: String,
    pub user: String,
    pub identity_file: PathBuf,
}

impl AliasEntry {
    /// Render as an indented `Host` stanza, newline terminated
    pub fn render(&self) -> String {
        let identity = self.identity_file.display().to_string();
        let identity = if identity.chars().any(char::is_whitespace) {
            format!("\"{identity}\"")
        } else {
            identity
        };

        format!(
            "Host {}\n    HostName {}\n    User {}\n    IdentityFile {}\n    IdentitiesOnly yes\n",
            self.alias, self.host_name, self.user, identity
        )
    }
}

/// Result of rewriting the SSH config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfigUpdate {
    pub path: PathBuf,
    /// Copy of the previous file, if there was one
    pub backup: Option<PathBuf>,
    /// Number of stanzas in the new block
    pub written: usize,
    /// Aliases already resolved by an entry before the block
    ///
    /// OpenSSH uses the first value it finds, so these aliases keep their
    /// old settings until the other entry is removed.
    pub shadowed: Vec<String>,
}

/// Render the complete managed block, or nothing for zero entries
pub fn render_block(entries: &[AliasEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let stanzas: Vec<String> = entries.iter().map(AliasEntry::render).collect();
    format!(
        "{BEGIN_MARKER}\n# Generated by ssh-rotate. Manual edits inside this block are replaced.\n\n{}{END_MARKER}\n",
        stanzas.join("\n")
    )
}

/// Config content split around the managed block
#[derive(Debug, PartialEq, Eq)]
struct ManagedRegion<'a> {
    prefix: &'a str,
    block: Option<&'a str>,
    suffix: &'a str,
}

impl<'a> ManagedRegion<'a> {
    fn parse(content: &'a str) -> Result<Self, String> {
        let mut begin = None;
        let mut end = None;
        let mut offset = 0;

        for line in content.split_inclusive('\n') {
            let start = offset;
            offset += line.len();

            let text = line.strip_suffix('\n').unwrap_or(line);
            let text = text.strip_suffix('\r').unwrap_or(text);
            match text {
                BEGIN_MARKER => {
                    if end.is_some() {
                        return Err("end marker appears before start marker".to_string());
                    }
                    if begin.is_some() {
                        return Err("start marker appears more than once".to_string());
                    }
                    begin = Some(start);
                }
                END_MARKER => {
                    if begin.is_none() {
                        return Err("end marker without a preceding start marker".to_string());
                    }
                    if end.is_some() {
                        return Err("end marker appears more than once".to_string());
                    }
                    end = Some(offset);
                }
                _ => {}
            }
        }

        match (begin, end) {
            (None, _) => Ok(Self {
                prefix: content,
                block: None,
                suffix: "",
            }),
            (Some(b), Some(e)) => Ok(Self {
                prefix: &content[..b],
                block: Some(&content[b..e]),
                suffix: &content[e..],
            }),
            (Some(_), None) => Err("start marker without a matching end marker".to_string()),
        }
    }

    /// Content outside the block
    fn outside(&self) -> String {
        format!("{}{}", self.prefix, self.suffix)
    }

    fn assemble(&self, new_block: &str) -> String {
        if self.block.is_some() {
            return format!("{}{}{}", self.prefix, new_block, self.suffix);
        }

        let mut out = self.prefix.to_string();
        if !new_block.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(new_block);
        }
        out
    }
}

/// Pick a backup path `<name>.bak.<stamp>` that does not exist yet
fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut base = path.as_os_str().to_owned();
    base.push(format!(".bak.{stamp}"));
    let base = PathBuf::from(base);

    let mut candidate = base.clone();
    let mut n = 0;
    while candidate.exists() {
        n += 1;
        let mut next = base.as_os_str().to_owned();
        next.push(format!(".{n}"));
        candidate = PathBuf::from(next);
    }
    candidate
}

fn backup_stamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S%.6f").to_string()
}

fn parse_client_config(content: &str) -> Option<SshConfig> {
    let mut reader = content.as_bytes();
    match SshConfig::default().parse(&mut reader, ParseRule::ALLOW_UNKNOWN_FIELDS) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::debug!("SSH config did not parse: {e}");
            None
        }
    }
}

/// Aliases that already resolve to a HostName in `preceding`
///
/// Only content before the block matters: OpenSSH takes the first value.
fn shadowed_aliases(preceding: &str, entries: &[AliasEntry]) -> Vec<String> {
    let Some(config) = parse_client_config(preceding) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| config.query(&entry.alias).host_name.is_some())
        .map(|entry| entry.alias.clone())
        .collect()
}

/// Port and ProxyJump the SSH config at `path` sets for each host address
///
/// Sessions ignore client config files, so these are the only settings
/// carried over. The managed block is left out. A missing or unreadable
/// file yields no routes.
pub fn connection_routes(path: &Path, hosts: &[HostRecord]) -> HashMap<String, HostRoute> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Not reading {} for Port/ProxyJump: {e}", path.display());
            }
            return HashMap::new();
        }
    };

    let outside = match ManagedRegion::parse(&content) {
        Ok(region) => region.outside(),
        Err(_) => content.clone(),
    };
    let Some(config) = parse_client_config(&outside) else {
        return HashMap::new();
    };

    let mut routes = HashMap::new();
    for host in hosts {
        let params = config.query(host.address());
        let route = HostRoute {
            port: params.port,
            proxy_jump: params.proxy_jump.map(|jumps| jumps.join(",")),
        };
        if !route.is_empty() {
            tracing::debug!("Reaching {} with {:?}", host.address(), route);
            routes.insert(host.address().to_string(), route);
        }
    }
    routes
}

fn ensure_parent_dir(path: &Path) -> Result<(), SshConfigError> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| {
        SshConfigError::Write(format!("Failed to create {}: {e}", dir.display()))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|e| {
            SshConfigError::Write(format!("Failed to set permissions on {}: {e}", dir.display()))
        })?;
    }

    Ok(())
}

/// Replace the managed block in the SSH config at `path` with `entries`
///
/// An existing file is backed up first. A missing file is created with mode
/// 0600. With no entries the block is removed. Malformed markers leave the
/// file untouched.
pub fn update_ssh_config(
    path: &Path,
    entries: &[AliasEntry],
) -> Result<SshConfigUpdate, SshConfigError> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            return Err(SshConfigError::Read(format!(
                "Failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let backup = match existing {
        Some(_) => {
            let backup = backup_path(path, &backup_stamp());
            fs::copy(path, &backup).map_err(|e| {
                SshConfigError::Backup(format!("Failed to copy to {}: {e}", backup.display()))
            })?;
            tracing::info!("Backed up SSH config to {}", backup.display());
            Some(backup)
        }
        None => None,
    };

    let content = existing.as_deref().unwrap_or_default();
    let region = ManagedRegion::parse(content).map_err(|reason| SshConfigError::MalformedBlock {
        path: path.to_path_buf(),
        reason,
    })?;

    let updated = region.assemble(&render_block(entries));

    if existing.is_none() {
        ensure_parent_dir(path)?;
    }
    fs::write(path, updated)
        .map_err(|e| SshConfigError::Write(format!("Failed to write {}: {e}", path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if existing.is_none() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                SshConfigError::Write(format!(
                    "Failed to set permissions on {}: {e}",
                    path.display()
                ))
            })?;
        }
    }

    let shadowed = shadowed_aliases(region.prefix, entries);
    for alias in &shadowed {
        tracing::warn!("Alias '{alias}' is already defined before the managed block");
    }

    tracing::info!(
        "Wrote {} alias(es) to managed block in {}",
        entries.len(),
        path.display()
    );

    Ok(SshConfigUpdate {
        path: path.to_path_buf(),
        backup,
        written: entries.len(),
        shadowed,
    })
}
