//! Host record schema
//!
//! A host record is one line of the host list after defaults are applied.

/// A remote host to rotate
///
/// Records are built once by the host list loader and never mutated
/// afterwards, so the fields are private and only exposed through getters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    address: String,
    alias: String,
    user: String,
}

/// Default remote user when neither the host list nor the config names one
pub fn default_user() -> String {
    whoami::username()
}

impl HostRecord {
    /// Create a host record, defaulting the alias to the address
    pub fn new(address: impl Into<String>, alias: Option<String>, user: impl Into<String>) -> Self {
        let address = address.into();
        let alias = alias.unwrap_or_else(|| address.clone());
        Self {
            address,
            alias,
            user: user.into(),
        }
    }

    /// Hostname or IP address used to connect
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Short local name written to the SSH config
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Remote login user
    pub fn user(&self) -> &str {
        &self.user
    }

    /// SSH destination in `user@address` form
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    /// Key comment tagging the generated key, `user@alias`
    pub fn key_comment(&self) -> String {
        format!("{}@{}", self.user, self.alias)
    }
}

impl std::fmt::Display for HostRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.alias == self.address {
            write!(f, "{}", self.destination())
        } else {
            write!(f, "{} ({})", self.alias, self.destination())
        }
    }
}
