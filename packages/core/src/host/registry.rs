//! Host list loading
//!
//! Parses the line-oriented host list (`ADDRESS [ALIAS] [USER]`) into
//! [`HostRecord`]s. Every token is validated against a strict character set
//! because aliases become file names and all three end up in the SSH config.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::error::HostListError;
use super::schema::HostRecord;

/// Load and parse a host list file
///
/// Fails if the file is missing, unreadable, invalid or has no records.
pub fn load_host_list(path: &Path, default_user: &str) -> Result<Vec<HostRecord>, HostListError> {
    if !path.exists() {
        return Err(HostListError::NotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|e| HostListError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hosts = parse_host_list(&contents, default_user)?;

    tracing::debug!("Loaded {} hosts from {}", hosts.len(), path.display());
    Ok(hosts)
}

/// Parse host list text, preserving line order
pub fn parse_host_list(text: &str, default_user: &str) -> Result<Vec<HostRecord>, HostListError> {
    let mut hosts = Vec::new();
    let mut seen_addresses: HashMap<String, usize> = HashMap::new();
    let mut seen_aliases: HashMap<String, usize> = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() > 3 {
            return Err(HostListError::InvalidLine {
                line,
                message: format!(
                    "expected ADDRESS [ALIAS] [USER], found {} fields",
                    fields.len()
                ),
            });
        }

        let address = fields[0];
        let alias = fields.get(1).copied().unwrap_or(address);
        let user = fields.get(2).copied().unwrap_or(default_user);

        let invalid = |message: String| HostListError::InvalidLine { line, message };
        validate_address(address).map_err(invalid)?;
        validate_alias(alias).map_err(invalid)?;
        validate_user(user).map_err(invalid)?;

        if let Some(&first) = seen_addresses.get(address) {
            return Err(HostListError::DuplicateAddress {
                line,
                first,
                address: address.to_string(),
            });
        }
        if let Some(&first) = seen_aliases.get(alias) {
            return Err(HostListError::DuplicateAlias {
                line,
                first,
                alias: alias.to_string(),
            });
        }
        seen_addresses.insert(address.to_string(), line);
        seen_aliases.insert(alias.to_string(), line);

        hosts.push(HostRecord::new(address, Some(alias.to_string()), user));
    }

    if hosts.is_empty() {
        return Err(HostListError::Empty);
    }

    Ok(hosts)
}

/// Hostname, IPv4, IPv6 or bracketed IPv6
pub fn validate_address(address: &str) -> Result<(), String> {
    if address.starts_with('-') {
        return Err(format!("address '{address}' must not start with '-'"));
    }

    if let Some(inner) = address.strip_prefix('[') {
        let Some(inner) = inner.strip_suffix(']') else {
            return Err(format!("address '{address}' has an unclosed '['"));
        };
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
        {
            return Err(format!("address '{address}' is not a valid bracketed IPv6 address"));
        }
        return Ok(());
    }

    check_charset("address", address, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')
    })
}

/// Alias used as a file name component and SSH config `Host` pattern
pub fn validate_alias(alias: &str) -> Result<(), String> {
    if alias.starts_with('-') || alias.starts_with('.') {
        return Err(format!("alias '{alias}' must not start with '-' or '.'"));
    }
    check_charset("alias", alias, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
    })
}

/// Remote login name
pub fn validate_user(user: &str) -> Result<(), String> {
    if user.starts_with('-') {
        return Err(format!("user '{user}' must not start with '-'"));
    }
    check_charset("user", user, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
    })
}

fn check_charset(kind: &str, value: &str, allowed: impl Fn(char) -> bool) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must not be empty"));
    }
    match value.chars().find(|&c| !allowed(c)) {
        Some(bad) => Err(format!("{kind} '{value}' contains invalid character {bad:?}")),
        None => Ok(()),
    }
}
