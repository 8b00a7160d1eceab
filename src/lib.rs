//! launchprep - self-healing runtime provisioning before application launch.
//!
//! Before handing control to a larger application, launchprep checks the
//! interpreter, installs the accelerator runtime and auxiliary packages
//! only when they are missing, and brings a companion git checkout to the
//! tip of its branch, repairing the workspace once if git fails.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, layering, and validation
//! - [`environment`] - Host platform and interpreter version checks
//! - [`error`] - Error types and result aliases
//! - [`overrides`] - JSON config override tool
//! - [`packages`] - Capability probes and idempotent pip installs
//! - [`repository`] - Branch resolution, clone/update, and autofix
//! - [`runner`] - The provisioning pipeline and application handoff
//! - [`shell`] - External command execution
//! - [`ui`] - Diagnostic blocks on stderr
//!
//! # Example
//!
//! ```
//! use launchprep::repository::{RepositorySynchronizer, RepositoryTarget, SyncOutcome};
//! use launchprep::shell::MockRunner;
//! use tempfile::TempDir;
//!
//! let temp = TempDir::new().unwrap();
//! let runner = MockRunner::new();
//! let sync = RepositorySynchronizer::new(&runner, "git");
//!
//! let target = RepositoryTarget::new("https://example.com/x.git", temp.path().join("x"), "x")
//!     .at_commit("abc1234");
//! assert_eq!(sync.sync(&target).unwrap(), SyncOutcome::Cloned);
//! assert_eq!(runner.call_count(), 2); // clone, then checkout
//! ```

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod overrides;
pub mod packages;
pub mod repository;
pub mod runner;
pub mod shell;
pub mod ui;

pub use error::{ProvisionError, Result};
