//! Top-level CLI definition: global flags plus the subcommand dispatch.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

/// Command-line front-end for a consistent hash ring.
///
/// Every subcommand opens (or creates) a ring and performs exactly one
/// library call; none of them contain ring logic of their own.
#[derive(Parser, Debug)]
#[command(name = "vring", version, about = "Consistent hash ring CLI")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Install the `tracing` subscriber (honoring `RUST_LOG`) and dispatch
    /// to the selected subcommand.
    pub fn run(self) -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
        self.command.run()
    }
}
