//! Prepare command implementation.
//!
//! The `launchprep prepare` command provisions the runtime, syncs the
//! companion checkout and hands off to the application.

use crate::cli::args::PrepareArgs;
use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::runner::{handoff_command, launch, Provisioner};
use crate::shell::ProcessRunner;

use super::dispatcher::{Command, CommandResult};

/// The prepare command implementation.
pub struct PrepareCommand {
    config: ProvisionConfig,
    args: PrepareArgs,
}

impl PrepareCommand {
    /// Create a new prepare command; flags in `args` win over `config`.
    pub fn new(mut config: ProvisionConfig, args: PrepareArgs) -> Self {
        apply_cli_flags(&mut config, &args);
        Self { config, args }
    }

    /// Get the effective configuration.
    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Runner used for every stage and the handoff.
    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.config.live_output)
    }
}

/// Layer command-line flags over the loaded configuration.
///
/// Switches only ever turn behavior on; a flag left off keeps whatever the
/// file or environment said.
pub fn apply_cli_flags(config: &mut ProvisionConfig, args: &PrepareArgs) {
    if let Some(branch) = &args.branch {
        config.companion.branch = branch.clone();
    }
    if let Some(token) = &args.ngrok {
        config.packages.ngrok_token = Some(token.clone());
    }

    let flags = &mut config.flags;
    flags.skip_python_version_check |= args.skip_python_version_check;
    flags.skip_torch_cuda_test |= args.skip_torch_cuda_test;
    flags.reinstall_xformers |= args.reinstall_xformers;
    flags.reinstall_torch |= args.reinstall_torch;
    flags.disable_update |= args.disable_update;
    flags.skip_prepare_environment |= args.skip_prepare_environment;
    flags.skip_install |= args.skip_install;
    flags.xformers |= args.xformers;
    config.accelerator.use_ipex |= args.use_ipex;
}

impl Command for PrepareCommand {
    fn execute(&self) -> Result<CommandResult> {
        self.config.validate()?;
        tracing::debug!(config = ?self.config, "effective configuration");

        let runner = self.runner();
        let working_dir = std::env::current_dir()?;
        let report = Provisioner::new(&self.config, &runner)
            .with_working_dir(working_dir)
            .prepare()?;
        tracing::debug!(?report, "environment prepared");

        let spec = handoff_command(&self.config, &self.args.forwarded, |key| {
            std::env::var_os(key).is_some()
        });
        let code = launch(&runner, &spec)?;
        Ok(CommandResult::from_exit_code(code))
    }
}
