//! Handing control to the downstream application.

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::shell::{CommandRunner, CommandSpec};

/// Environment defaults for the downstream process, applied only when the
/// variable is not already set.
pub const HANDOFF_ENV_DEFAULTS: &[(&str, &str)] = &[
    ("SD_WEBUI_RESTARTING", "1"),
    ("GRADIO_ANALYTICS_ENABLED", "False"),
];

/// Build the entry command: `<python> <handoff args> <forwarded...>`, run
/// live from the application root.
///
/// `env_fn` reports whether a variable is already present in the
/// environment.
pub fn handoff_command<F>(config: &ProvisionConfig, forwarded: &[String], env_fn: F) -> CommandSpec
where
    F: Fn(&str) -> bool,
{
    let mut spec = CommandSpec::new(&config.python)
        .args(config.handoff.args.iter().cloned())
        .args(forwarded.iter().cloned())
        .cwd(&config.root)
        .live(true);
    for (key, value) in HANDOFF_ENV_DEFAULTS {
        if !env_fn(key) {
            spec = spec.env(*key, *value);
        }
    }
    spec
}

/// Run the downstream application and return its exit code.
///
/// A non-zero exit is the child's business and is returned, not raised.
/// Only a failure to start the child is an error.
pub fn launch(runner: &dyn CommandRunner, spec: &CommandSpec) -> Result<i32> {
    tracing::info!("Launching with arguments: {}", spec.display());
    match runner.run(spec) {
        Ok(result) => Ok(result.exit_code.unwrap_or(0)),
        Err(ProvisionError::CommandFailed { exit_code, .. }) => Ok(exit_code.unwrap_or(1)),
        Err(e) => Err(e),
    }
}
