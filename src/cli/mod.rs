//! Command-line interface for launchprep.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, OverrideArgs, PrepareArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
