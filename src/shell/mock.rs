//! Scripted command runner for testing.
//!
//! `MockRunner` implements [`CommandRunner`] without spawning processes. It
//! records every [`CommandSpec`] it receives and answers with responses
//! scripted against a substring of the rendered command line.
//!
//! # Example
//!
//! ```
//! use launchprep::shell::{CommandRunner, CommandSpec, MockResponse, MockRunner};
//!
//! let runner = MockRunner::new();
//! runner.respond("rev-parse HEAD", MockResponse::stdout("abc123\n"));
//! runner.respond("fetch", MockResponse::failure(128, "fatal: bad object"));
//!
//! let head = runner
//!     .run(&CommandSpec::new("git").args(["rev-parse", "HEAD"]))
//!     .unwrap();
//! assert_eq!(head.stdout.trim(), "abc123");
//! assert!(!runner.succeeds(&CommandSpec::new("git").arg("fetch")));
//! assert_eq!(runner.count_matching("fetch"), 1);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{ProvisionError, Result};

use super::command::{CommandResult, CommandRunner, CommandSpec};

/// A scripted answer for a matching command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Exit 0 with the given stdout.
    Success(String),
    /// Non-zero exit with the given stderr.
    Failure { code: i32, stderr: String },
    /// The program could not be started.
    NotFound,
}

impl MockResponse {
    pub fn ok() -> Self {
        Self::Success(String::new())
    }

    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self::Success(stdout.into())
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self::Failure {
            code,
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    queue: VecDeque<MockResponse>,
    last: MockResponse,
}

/// Command runner that records calls and replays scripted responses.
///
/// Rules are checked in registration order; the first rule whose pattern is
/// contained in the rendered command wins. A rule registered with
/// [`respond_seq`](Self::respond_seq) pops one response per call and keeps
/// repeating its last response once drained. Unmatched commands succeed with
/// empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer commands containing `pattern` with `response`.
    pub fn respond(&self, pattern: &str, response: MockResponse) {
        self.respond_seq(pattern, vec![response]);
    }

    /// Answer successive matching commands with `responses` in order.
    pub fn respond_seq(&self, pattern: &str, responses: Vec<MockResponse>) {
        let mut queue: VecDeque<MockResponse> = responses.into();
        let last = queue.back().cloned().unwrap_or_else(MockResponse::ok);
        if queue.len() == 1 {
            queue.clear();
        }
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            queue,
            last,
        });
    }

    /// Every spec received so far, in order.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Rendered command lines received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandSpec::display).collect()
    }

    /// Number of commands received.
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Number of received commands whose rendered line contains `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| spec.display().contains(pattern))
            .count()
    }

    /// Forget recorded calls, keeping the scripted rules.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn next_response(&self, rendered: &str) -> MockResponse {
        let mut rules = self.rules.borrow_mut();
        match rules
            .iter_mut()
            .find(|rule| rendered.contains(&rule.pattern))
        {
            Some(rule) => rule.queue.pop_front().unwrap_or_else(|| rule.last.clone()),
            None => MockResponse::ok(),
        }
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let rendered = spec.display();
        self.calls.borrow_mut().push(spec.clone());

        match self.next_response(&rendered) {
            MockResponse::Success(stdout) => Ok(CommandResult::success(stdout)),
            MockResponse::Failure { code, stderr } => Err(ProvisionError::CommandFailed {
                command: rendered,
                description: spec.error_description().map(str::to_string),
                exit_code: Some(code),
                stdout: String::new(),
                stderr,
            }),
            MockResponse::NotFound => Err(ProvisionError::CommandSpawn {
                command: rendered,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "program not found"),
            }),
        }
    }
}
