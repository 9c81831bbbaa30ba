//! CLI command implementations

mod config;
mod rotate;
mod settings;

pub use config::{ConfigArgs, cmd_config};
pub use rotate::{RotateArgs, cmd_rotate};
