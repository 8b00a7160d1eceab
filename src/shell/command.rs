//! External command execution.
//!
//! Commands are described by an immutable [`CommandSpec`] and executed by a
//! [`CommandRunner`]. Every call spawns exactly one child process; a non-zero
//! exit becomes [`ProvisionError::CommandFailed`]. Retrying is always the
//! caller's decision.

use crate::error::{ProvisionError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Description of a single command execution.
///
/// Commands are always a program plus an argument vector; nothing is
/// interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    live: Option<bool>,
    description: Option<String>,
    error_description: Option<String>,
}

impl CommandSpec {
    /// Start building a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            live: None,
            description: None,
            error_description: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(new_args.into_iter().map(Into::into));
        self
    }

    /// Run the command in `dir`.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment override (merged over the inherited environment).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Force live (`true`) or captured (`false`) output for this call.
    pub fn live(mut self, live: bool) -> Self {
        self.live = Some(live);
        self
    }

    /// Progress message logged before the command starts.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Headline used in the failure diagnostic.
    pub fn on_error(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Explicit output mode, `None` when the runner default applies.
    pub fn live_override(&self) -> Option<bool> {
        self.live
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }

    /// Render the command as a single line for logs and diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| quote_for_display(part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&self.env);
        cmd
    }
}

fn quote_for_display(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) {
        format!("\"{part}\"")
    } else {
        part.to_string()
    }
}

/// Result of executing a command.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Captured standard output (empty in live mode).
    pub stdout: String,

    /// Captured standard error (empty in live mode).
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// Whether the command exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes commands on behalf of the provisioning components.
pub trait CommandRunner {
    /// Run a command once.
    ///
    /// Returns `Err(CommandFailed)` for a non-zero exit and
    /// `Err(CommandSpawn)` when the program cannot be started.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult>;

    /// Run a command and report only whether it succeeded.
    fn succeeds(&self, spec: &CommandSpec) -> bool {
        self.run(spec).is_ok()
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        (**self).run(spec)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    live_by_default: bool,
}

impl ProcessRunner {
    /// Create a runner whose default output mode is `live_by_default`.
    pub fn new(live_by_default: bool) -> Self {
        Self { live_by_default }
    }

    pub fn live_by_default(&self) -> bool {
        self.live_by_default
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        if let Some(description) = spec.description() {
            tracing::info!("{description}");
        }
        let live = spec.live_override().unwrap_or(self.live_by_default);
        let rendered = spec.display();
        tracing::debug!(command = %rendered, live, "running command");

        let start = Instant::now();
        let mut cmd = spec.to_command();
        let (exit_code, stdout, stderr) = if live {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
            let status = cmd.status().map_err(|source| ProvisionError::CommandSpawn {
                command: rendered.clone(),
                source,
            })?;
            (status.code(), String::new(), String::new())
        } else {
            cmd.stdin(Stdio::null());
            let output = cmd.output().map_err(|source| ProvisionError::CommandSpawn {
                command: rendered.clone(),
                source,
            })?;
            (
                output.status.code(),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            )
        };
        let duration = start.elapsed();

        if exit_code == Some(0) {
            tracing::debug!(command = %rendered, ?duration, "command succeeded");
            Ok(CommandResult {
                exit_code,
                stdout,
                stderr,
                duration,
            })
        } else {
            Err(ProvisionError::CommandFailed {
                command: rendered,
                description: spec.error_description().map(str::to_string),
                exit_code,
                stdout,
                stderr,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn captured() -> ProcessRunner {
        ProcessRunner::new(false)
    }

    #[test]
    fn run_successful_command_captures_stdout() {
        let result = captured()
            .run(&CommandSpec::new("echo").arg("hello"))
            .unwrap();

        assert!(result.succeeded());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failing_command_returns_command_failed() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .on_error("Couldn't do the thing");
        let err = captured().run(&spec).unwrap_err();

        match err {
            ProvisionError::CommandFailed {
                exit_code,
                stderr,
                description,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("oops"));
                assert_eq!(description.as_deref(), Some("Couldn't do the thing"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_returns_spawn_error() {
        let err = captured()
            .run(&CommandSpec::new("definitely-not-a-real-program-xyz"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::CommandSpawn { .. }));
    }

    #[test]
    fn argv_arguments_are_not_shell_interpreted() {
        let result = captured()
            .run(&CommandSpec::new("echo").arg("$HOME; rm -rf /"))
            .unwrap();
        assert_eq!(result.stdout.trim(), "$HOME; rm -rf /");
    }

    #[test]
    fn run_with_env_override() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo $PROVISION_TEST_VAR"])
            .env("PROVISION_TEST_VAR", "my_value");
        let result = captured().run(&spec).unwrap();
        assert!(result.stdout.contains("my_value"));
    }

    #[test]
    fn run_with_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = captured()
            .run(&CommandSpec::new("pwd").cwd(temp.path()))
            .unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(temp.path()).unwrap());
    }

    #[test]
    fn live_mode_does_not_capture() {
        let result = captured()
            .run(&CommandSpec::new("true").live(true))
            .unwrap();
        assert!(result.stdout.is_empty());
        assert!(result.succeeded());
    }

    #[test]
    fn succeeds_reports_bool() {
        let runner = captured();
        assert!(runner.succeeds(&CommandSpec::new("true")));
        assert!(!runner.succeeds(&CommandSpec::new("false")));
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("git").args(["-C", "/tmp/my repo", "fetch"]);
        assert_eq!(spec.display(), "git -C \"/tmp/my repo\" fetch");
    }

    #[test]
    fn runner_default_applies_without_override() {
        let spec = CommandSpec::new("echo").arg("hi");
        assert_eq!(spec.live_override(), None);

        let live = ProcessRunner::new(true).run(&spec).unwrap();
        assert!(live.succeeded());
        assert!(live.stdout.is_empty());

        let captured = ProcessRunner::new(false).run(&spec).unwrap();
        assert_eq!(captured.stdout.trim(), "hi");
    }

    #[test]
    fn per_call_override_beats_runner_default() {
        let result = ProcessRunner::new(true)
            .run(&CommandSpec::new("echo").arg("hi").live(false))
            .unwrap();
        assert_eq!(result.stdout.trim(), "hi");
    }
}
