//! Command execution.
//!
//! - [`command`] - command specs, results, and the process-backed runner
//! - [`mock`] - scripted runner for tests

pub mod command;
pub mod mock;

pub use command::{CommandResult, CommandRunner, CommandSpec, ProcessRunner};
pub use mock::{MockResponse, MockRunner};
