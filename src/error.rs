//! Error types for provisioning operations.
//!
//! This module defines [`ProvisionError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Soft failures (capability probes, commit resolution) never become a
//!   `ProvisionError`; they are reported as `bool` or `Option`
//! - Use `ProvisionError` for failures that must abort the pipeline
//! - Use `anyhow::Error` (via `ProvisionError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// An external command exited with a non-zero status.
    #[error("{}", format_command_failure(.description.as_deref(), .command, .exit_code, .stdout, .stderr))]
    CommandFailed {
        command: String,
        description: Option<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("Could not start command: {command}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The autofix repair ran but the original operation still failed.
    #[error("Repository '{name}': {operation} still failing after autofix: {source}")]
    RepositoryRepairExhausted {
        name: String,
        operation: String,
        #[source]
        source: Box<ProvisionError>,
    },

    /// A required runtime capability is not usable on this machine.
    #[error("{capability} is not available: {remediation}")]
    CapabilityUnavailable {
        capability: String,
        remediation: String,
    },

    /// A path exists but is not a git working copy.
    #[error("{} exists but is not a git checkout", .path.display())]
    NotARepository { path: PathBuf },

    /// Explicitly requested configuration file was not found.
    #[error("Configuration not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {}: {message}", .path.display())]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// The config override tool could not load or write its JSON document.
    #[error("Override failed for {}: {message}", .path.display())]
    OverrideError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Exit code of the failed command, if this error wraps one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => *exit_code,
            Self::RepositoryRepairExhausted { source, .. } => source.exit_code(),
            _ => None,
        }
    }

    /// A short remediation hint shown under the diagnostic block.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { .. } => {
                Some("Check the command output above, your network connection and the package index.")
            }
            Self::CommandSpawn { .. } => {
                Some("Make sure the program is installed and on PATH (see the GIT and PYTHON variables).")
            }
            Self::RepositoryRepairExhausted { .. } | Self::NotARepository { .. } => {
                Some("Delete the companion directory and run again to get a fresh clone.")
            }
            Self::CapabilityUnavailable { .. } => {
                Some("Pass --skip-torch-cuda-test to continue without the accelerator check.")
            }
            Self::ConfigNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::ConfigValidationError { .. } => Some("Fix the configuration and run again."),
            _ => None,
        }
    }
}

fn format_command_failure(
    description: Option<&str>,
    command: &str,
    exit_code: &Option<i32>,
    stdout: &str,
    stderr: &str,
) -> String {
    let mut lines = vec![
        format!("{}.", description.unwrap_or("Error running command")),
        format!("Command: {command}"),
        match exit_code {
            Some(code) => format!("Error code: {code}"),
            None => "Error code: terminated by signal".to_string(),
        },
    ];
    if !stdout.trim().is_empty() {
        lines.push(format!("stdout: {}", stdout.trim_end()));
    }
    if !stderr.trim().is_empty() {
        lines.push(format!("stderr: {}", stderr.trim_end()));
    }
    lines.join("\n")
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
