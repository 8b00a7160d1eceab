//! Override command implementation.
//!
//! The `launchprep override` command patches a JSON training config and
//! runs the training script with the patched copy.

use crate::cli::args::OverrideArgs;
use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::overrides::OverrideJob;
use crate::shell::ProcessRunner;

use super::dispatcher::{Command, CommandResult};

/// The override command implementation.
pub struct OverrideCommand {
    job: OverrideJob,
}

impl OverrideCommand {
    /// Create a new override command; the interpreter comes from `config`.
    pub fn new(config: ProvisionConfig, args: OverrideArgs) -> Self {
        let forwarded_dirs = args.forwarded_dirs();
        Self {
            job: OverrideJob {
                json_path: args.json_path,
                overrides: args.overrides,
                python: config.python,
                train_script: args.train_script_path,
                temp_dir: args.temp_config_dir,
                delete_temp_config: args.delete_temp_config,
                forwarded_dirs,
            },
        }
    }

    pub fn job(&self) -> &OverrideJob {
        &self.job
    }
}

impl Command for OverrideCommand {
    fn execute(&self) -> Result<CommandResult> {
        let code = self.job.run(&ProcessRunner::new(true))?;
        Ok(CommandResult::from_exit_code(code))
    }
}
