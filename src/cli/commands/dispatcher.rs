//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, PrepareArgs};
use crate::config::{apply_system_env, load_config, ProvisionConfig};
use crate::error::Result;

use super::overrides::OverrideCommand;
use super::prepare::PrepareCommand;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command.
    fn execute(&self) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a result from a child process exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    root: PathBuf,
    config_path: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given application root.
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self { root, config_path }
    }

    /// Get the application root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Defaults, then the config file, then environment variables.
    ///
    /// Command-line flags are applied by each command on top of this.
    pub fn load_config(&self) -> Result<ProvisionConfig> {
        let mut config = load_config(&self.root, self.config_path.as_deref())?;
        apply_system_env(&mut config);
        Ok(config)
    }

    /// Dispatch a command based on CLI arguments.
    pub fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        let config = self.load_config()?;
        match &cli.command {
            Some(Commands::Prepare(args)) => PrepareCommand::new(config, args.clone()).execute(),
            Some(Commands::Override(args)) => OverrideCommand::new(config, args.clone()).execute(),
            // Default to prepare with default args
            None => PrepareCommand::new(config, PrepareArgs::default()).execute(),
        }
    }
}
