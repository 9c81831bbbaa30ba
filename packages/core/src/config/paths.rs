//! XDG-compliant path resolution for ssh-rotate
//!
//! - Linux/macOS: `~/.config/ssh-rotate/`
//! - Windows: `%APPDATA%\ssh-rotate\`

use std::path::PathBuf;

/// Get the configuration directory path
///
/// Returns the directory where config.json is looked up:
/// - Linux: `~/.config/ssh-rotate/`
/// - macOS: `~/.config/ssh-rotate/` (XDG-style, not ~/Library)
/// - Windows: `%APPDATA%\ssh-rotate\`
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".config").join("ssh-rotate"))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .map(|d| d.join("ssh-rotate"))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Get the full path to the config file
///
/// Returns: `{config_dir}/config.json`
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("config.json"))
}

/// Expand a leading `~/` (or a bare `~`) against the home directory
///
/// Other values, and everything when no home directory is known, are
/// returned unchanged.
pub fn expand_tilde(value: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (value, home) {
        ("~", Some(home)) => home,
        (v, Some(home)) if v.starts_with("~/") => home.join(&v[2..]),
        (v, _) => PathBuf::from(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_exists() {
        let dir = get_config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("ssh-rotate"));
    }

    #[test]
    fn test_config_path_ends_with_config_json() {
        let path = get_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("ssh-rotate/config.json"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/.ssh/id_rsa"), home.join(".ssh").join("id_rsa"));
        assert_eq!(expand_tilde("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_tilde("hosts.txt"), PathBuf::from("hosts.txt"));
        // Only the current user's home is expanded
        assert_eq!(expand_tilde("~other/x"), PathBuf::from("~other/x"));
    }
}
