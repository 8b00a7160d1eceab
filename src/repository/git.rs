//! Thin wrapper around the `git` executable.
//!
//! Every method builds one argument-vector command and hands it to the
//! configured [`CommandRunner`]. Long-running transfers (clone, fetch,
//! checkout, repair) stream live so progress is visible; queries capture.

use std::path::Path;

use crate::error::{ProvisionError, Result};
use crate::shell::{CommandResult, CommandRunner, CommandSpec};

/// Git commands scoped to one executable and runner.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program)
    }

    fn in_dir(&self, dir: &Path) -> CommandSpec {
        self.command().arg("-C").arg(dir.to_string_lossy())
    }

    /// Full commit id of HEAD.
    pub fn head(&self, dir: &Path, name: &str) -> Result<String> {
        let spec = self
            .in_dir(dir)
            .args(["rev-parse", "HEAD"])
            .live(false)
            .on_error(format!("Couldn't determine {name}'s hash"));
        Ok(self.runner.run(&spec)?.stdout.trim().to_string())
    }

    /// URL of `origin`, `None` when no such remote is configured.
    ///
    /// `git config --get` exits 1 only for a missing key; any other failure
    /// (unreadable config, not a repository) is returned as an error.
    pub fn origin_url(&self, dir: &Path) -> Result<Option<String>> {
        let spec = self
            .in_dir(dir)
            .args(["config", "--get", "remote.origin.url"])
            .live(false)
            .on_error(format!("Couldn't read the origin URL in {}", dir.display()));
        match self.runner.run(&spec) {
            Ok(result) => {
                let url = result.stdout.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(ProvisionError::CommandFailed {
                exit_code: Some(1),
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Point `origin` at `url`, creating the remote when missing.
    pub fn set_origin_url(&self, dir: &Path, name: &str, url: &str, exists: bool) -> Result<()> {
        let action = if exists { "set-url" } else { "add" };
        let spec = self
            .in_dir(dir)
            .args(["remote", action, "origin", url])
            .live(false)
            .on_error(format!("Failed to set {name}'s origin URL"));
        self.runner.run(&spec)?;
        Ok(())
    }

    pub fn clone_repo(&self, url: &str, dir: &Path, name: &str) -> Result<()> {
        let spec = self
            .command()
            .args(["clone", "--config", "core.filemode=false", url])
            .arg(dir.to_string_lossy())
            .live(true)
            .describe(format!("Cloning {name} into {}...", dir.display()))
            .on_error(format!("Couldn't clone {name}"));
        self.runner.run(&spec)?;
        Ok(())
    }

    pub fn fetch(&self, dir: &Path, name: &str) -> Result<()> {
        let spec = self
            .in_dir(dir)
            .arg("fetch")
            .live(true)
            .describe(format!("Fetching updates for {name}..."))
            .on_error(format!("Couldn't fetch {name}"));
        self.runner.run(&spec)?;
        Ok(())
    }

    pub fn checkout(&self, dir: &Path, name: &str, revision: &str) -> Result<()> {
        let spec = self
            .in_dir(dir)
            .args(["checkout", revision])
            .live(true)
            .describe(format!("Checking out {revision} for {name}..."))
            .on_error(format!("Couldn't checkout {revision} for {name}"));
        self.runner.run(&spec)?;
        Ok(())
    }

    /// Re-download every object, ignoring shallow or partial history.
    pub fn refetch(&self, dir: &Path, name: &str) -> Result<()> {
        let spec = self
            .in_dir(dir)
            .args(["fetch", "--refetch", "--no-auto-gc"])
            .live(true)
            .describe(format!("Fetching all contents for {name}"))
            .on_error(format!("Couldn't fetch {name}"));
        self.runner.run(&spec)?;
        Ok(())
    }

    /// Drop unreachable objects and repack.
    pub fn prune_aggressive(&self, dir: &Path, name: &str) -> Result<()> {
        let spec = self
            .in_dir(dir)
            .args(["gc", "--aggressive", "--prune=now"])
            .live(true)
            .describe(format!("Pruning {name}"))
            .on_error(format!("Couldn't prune {name}"));
        self.runner.run(&spec)?;
        Ok(())
    }

    pub fn pull(&self, dir: &Path) -> Result<CommandResult> {
        let spec = self
            .in_dir(dir)
            .arg("pull")
            .live(false)
            .on_error(format!("Couldn't pull in {}", dir.display()));
        self.runner.run(&spec)
    }

    /// `git ls-remote <url> <refname>`, captured.
    pub fn ls_remote(&self, url: &str, refname: &str) -> Result<CommandResult> {
        let spec = self
            .command()
            .args(["ls-remote", url, refname])
            .live(false);
        self.runner.run(&spec)
    }
}
