//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! Commands are dispatched via [`CommandDispatcher`], which loads the
//! configuration once and routes CLI subcommands to their implementations.

pub mod dispatcher;
pub mod overrides;
pub mod prepare;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
pub use overrides::OverrideCommand;
pub use prepare::{apply_cli_flags, PrepareCommand};
