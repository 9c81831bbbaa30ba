//! Version information for ssh-rotate

/// Get the current version string
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the long version string with build information
///
/// Build metadata comes from `SSH_ROTATE_GIT_HASH` and
/// `SSH_ROTATE_BUILD_DATE` at compile time, and reads "unknown" without them.
pub fn get_version_long() -> String {
    let git_hash = option_env!("SSH_ROTATE_GIT_HASH").unwrap_or("unknown");
    let build_date = option_env!("SSH_ROTATE_BUILD_DATE").unwrap_or("unknown");

    format!("{} (git: {git_hash}, built: {build_date})", get_version())
}
