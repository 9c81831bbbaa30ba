//! Host handling
//!
//! Everything that deals with remote hosts and how the local client reaches
//! them:
//! - Host list loading and validation
//! - Remote sessions through the system `ssh` client
//! - The managed alias block in `~/.ssh/config`

mod error;
mod registry;
mod schema;
mod session;
mod ssh_config;

// Public exports
pub use error::{HostListError, SessionError, SshConfigError};
pub use registry::{load_host_list, parse_host_list, validate_address, validate_alias, validate_user};
pub use schema::{HostRecord, default_user};
pub use session::{
    DEFAULT_CONNECT_TIMEOUT_SECS, HostRoute, OpenSshTransport, RemoteOp, SessionOutput,
    SessionTransport,
};
pub use ssh_config::{
    AliasEntry, BEGIN_MARKER, END_MARKER, SshConfigUpdate, connection_routes, render_block,
    update_ssh_config,
};
