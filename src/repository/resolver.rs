//! Branch tip resolution without a clone.

use crate::error::ProvisionError;
use crate::repository::git::Git;

/// Looks up the current commit of a remote branch with `git ls-remote`.
pub struct CommitResolver<'a> {
    git: &'a Git<'a>,
}

impl<'a> CommitResolver<'a> {
    pub fn new(git: &'a Git<'a>) -> Self {
        Self { git }
    }

    /// Commit id at the tip of `refs/heads/<branch>` on `repo_url`.
    ///
    /// Returns `None` when the branch does not exist, the remote cannot be
    /// reached, the output cannot be parsed, or git itself is missing.
    /// Callers fall back to unpinned behavior; this never fails.
    pub fn resolve_branch_tip(&self, repo_url: &str, branch: &str) -> Option<String> {
        let refname = format!("refs/heads/{branch}");
        let result = match self.git.ls_remote(repo_url, &refname) {
            Ok(result) => result,
            Err(ProvisionError::CommandSpawn { .. }) => {
                tracing::warn!(
                    "'{}' command not found. Please ensure Git is installed and in your PATH.",
                    self.git.program()
                );
                return None;
            }
            Err(e) => {
                tracing::warn!("Could not get latest commit for branch '{branch}' on '{repo_url}': {e}");
                return None;
            }
        };

        let Some(first_line) = result.stdout.lines().find(|line| !line.trim().is_empty()) else {
            tracing::warn!("No output from 'git ls-remote' for branch '{branch}' on '{repo_url}'.");
            return None;
        };

        match first_line.split_whitespace().next() {
            Some(token) if is_commit_id(token) => Some(token.to_string()),
            _ => {
                tracing::warn!(
                    "Could not parse commit hash from 'git ls-remote' output for branch '{branch}': {first_line}"
                );
                None
            }
        }
    }
}

/// Whether `token` looks like a full or abbreviated commit id.
pub fn is_commit_id(token: &str) -> bool {
    (7..=64).contains(&token.len()) && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockResponse, MockRunner};

    const SHA: &str = "3f1c2a9e8b7d6c5f4e3d2c1b0a9f8e7d6c5b4a39";

    fn resolve(runner: &MockRunner) -> Option<String> {
        let git = Git::new(runner, "git");
        CommitResolver::new(&git).resolve_branch_tip("https://x/y.git", "main")
    }

    #[test]
    fn parses_first_token_of_first_line() {
        let runner = MockRunner::new();
        runner.respond(
            "ls-remote",
            MockResponse::stdout(format!("{SHA}\trefs/heads/main\n")),
        );
        assert_eq!(resolve(&runner).as_deref(), Some(SHA));
        assert_eq!(
            runner.calls()[0],
            "git ls-remote https://x/y.git refs/heads/main"
        );
    }

    #[test]
    fn empty_output_is_none() {
        let runner = MockRunner::new();
        runner.respond("ls-remote", MockResponse::stdout(""));
        assert_eq!(resolve(&runner), None);
    }

    #[test]
    fn unreachable_remote_is_none() {
        let runner = MockRunner::new();
        runner.respond(
            "ls-remote",
            MockResponse::failure(128, "fatal: unable to access"),
        );
        assert_eq!(resolve(&runner), None);
    }

    #[test]
    fn missing_git_is_none() {
        let runner = MockRunner::new();
        runner.respond("ls-remote", MockResponse::NotFound);
        assert_eq!(resolve(&runner), None);
    }

    #[test]
    fn garbage_output_is_none() {
        let runner = MockRunner::new();
        runner.respond("ls-remote", MockResponse::stdout("warning: something odd\n"));
        assert_eq!(resolve(&runner), None);
    }

    #[test]
    fn commit_id_shape() {
        assert!(is_commit_id(SHA));
        assert!(is_commit_id("abc1234"));
        assert!(!is_commit_id("abc12"));
        assert!(!is_commit_id("refs/heads/main"));
    }
}
