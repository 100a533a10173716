//! CLI tool for managing consistent hash rings.
//!
//! Provides commands for:
//! - Creating and inspecting a ring (`create`, `get-pnodes`, `get-vnodes`,
//!   `get-node`, `get-vnode-pnode-and-data`, `get-data-vnodes`, `print-hash`)
//! - Mutating a ring (`add-data`, `remap-vnode`, `remove-pnode`)
//! - Moving a ring between hosts (`deserialize-ring`)
//! - Comparing two rings (`diff`)

pub mod commands;
pub mod config;

pub use commands::Command;
pub use config::CliConfig;
