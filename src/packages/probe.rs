//! Capability probes.
//!
//! Probes answer yes/no questions about the target interpreter by running
//! it in a fresh, captured subprocess, so an unsupported feature can never
//! crash this process. Every failure, including a missing interpreter,
//! degrades to `false`.
//!
//! # Example
//!
//! ```
//! use launchprep::packages::CapabilityProbe;
//! use launchprep::shell::{MockResponse, MockRunner};
//!
//! let runner = MockRunner::new();
//! runner.respond("distribution", MockResponse::failure(1, "PackageNotFoundError"));
//! runner.respond("find_spec", MockResponse::ok());
//!
//! let probe = CapabilityProbe::new(&runner, "python3");
//! // Importable without distribution metadata still counts as installed.
//! assert!(probe.is_installed("clip"));
//! ```

use crate::shell::{CommandRunner, CommandSpec};

/// Exit 0 when installed distribution metadata exists for `sys.argv[1]`.
const METADATA_QUERY: &str = "import sys, importlib.metadata as m; m.distribution(sys.argv[1])";

/// Exit 0 when `sys.argv[1]` resolves as an importable module.
const MODULE_QUERY: &str =
    "import sys, importlib.util as u; sys.exit(0 if u.find_spec(sys.argv[1]) is not None else 1)";

/// Side-effect-free queries against the target interpreter.
pub struct CapabilityProbe<'a> {
    runner: &'a dyn CommandRunner,
    python: String,
}

impl<'a> CapabilityProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, python: impl Into<String>) -> Self {
        Self {
            runner,
            python: python.into(),
        }
    }

    /// Whether `name` is installed.
    ///
    /// Checks distribution metadata first, then falls back to module
    /// resolution, since some packages are importable without registered
    /// metadata.
    pub fn is_installed(&self, name: &str) -> bool {
        if self.query(METADATA_QUERY, name) {
            tracing::debug!(package = name, "found installed distribution");
            return true;
        }
        let importable = self.query(MODULE_QUERY, name);
        tracing::debug!(package = name, importable, "no distribution metadata");
        importable
    }

    /// Run `snippet` in a fresh interpreter and report whether it exited 0.
    pub fn probe_runtime(&self, snippet: &str) -> bool {
        let spec = CommandSpec::new(&self.python)
            .args(["-c", snippet])
            .live(false);
        match self.runner.run(&spec) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(snippet, error = %e, "runtime probe failed");
                false
            }
        }
    }

    fn query(&self, code: &str, name: &str) -> bool {
        let spec = CommandSpec::new(&self.python)
            .args(["-c", code, name])
            .live(false);
        self.runner.succeeds(&spec)
    }
}
