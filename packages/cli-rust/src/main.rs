//! ssh-rotate CLI - Rotate SSH keys across a fleet of hosts
//!
//! This is the main entry point for the Rust CLI binary.

fn main() -> anyhow::Result<()> {
    ssh_rotate::run()
}
