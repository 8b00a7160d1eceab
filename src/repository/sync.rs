//! Working copy synchronization.
//!
//! [`RepositorySynchronizer::sync`] brings a local path to match a remote
//! URL and, optionally, a pinned commit:
//!
//! | State | Action | Outcome |
//! |---|---|---|
//! | absent (or empty dir) | clone, then checkout the pin | `Cloned` |
//! | present, no pin | nothing, no network | `AlreadyCurrent` |
//! | present, HEAD at pin | nothing, no network | `AlreadyCurrent` |
//! | present, HEAD elsewhere | fix origin, fetch, checkout (autofix) | `Updated` |
//!
//! A present checkout without a pin is never refreshed, even if the remote
//! has moved on. Re-running provisioning must not touch a workspace the
//! caller did not ask to change; callers wanting freshness pass a pin.
//!
//! The caller owns the path for the duration of a call. Nothing here locks
//! against a second provisioner working on the same path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::repository::autofix::Autofix;
use crate::repository::git::Git;
use crate::shell::CommandRunner;

/// Where a repository should live and which revision it should be at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub url: String,
    pub path: PathBuf,
    /// Human-readable name for messages.
    pub name: String,
    /// Commit to converge to; `None` tracks whatever the clone's default
    /// branch gives.
    pub commit: Option<String>,
}

impl RepositoryTarget {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            name: name.into(),
            commit: None,
        }
    }

    /// Pin the target to `commit`.
    pub fn at_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }
}

/// What a successful sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    AlreadyCurrent,
    Updated,
    Cloned,
}

/// Observed state of the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Absent,
    PresentUnpinned,
    PresentAtCommit,
    PresentWrongCommit,
}

/// Clones and updates working copies through the git executable.
pub struct RepositorySynchronizer<'a> {
    git: Git<'a>,
}

impl<'a> RepositorySynchronizer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, git_program: impl Into<String>) -> Self {
        Self {
            git: Git::new(runner, git_program),
        }
    }

    pub fn git(&self) -> &Git<'a> {
        &self.git
    }

    /// Classify the target path without touching the network.
    pub fn inspect(&self, target: &RepositoryTarget) -> Result<WorkspaceState> {
        if is_absent(&target.path)? {
            return Ok(WorkspaceState::Absent);
        }
        if !target.path.join(".git").exists() {
            return Err(ProvisionError::NotARepository {
                path: target.path.clone(),
            });
        }
        let Some(commit) = &target.commit else {
            return Ok(WorkspaceState::PresentUnpinned);
        };

        match self.git.head(&target.path, &target.name) {
            Ok(head) if head == *commit => Ok(WorkspaceState::PresentAtCommit),
            Ok(head) => {
                tracing::debug!(name = %target.name, %head, target = %commit, "HEAD differs from target");
                Ok(WorkspaceState::PresentWrongCommit)
            }
            Err(e) => {
                tracing::warn!("Couldn't read {}'s HEAD, treating it as outdated: {e}", target.name);
                Ok(WorkspaceState::PresentWrongCommit)
            }
        }
    }

    /// Bring `target.path` into the state `target` describes.
    pub fn sync(&self, target: &RepositoryTarget) -> Result<SyncOutcome> {
        match self.inspect(target)? {
            WorkspaceState::Absent => self.clone_fresh(target),
            WorkspaceState::PresentUnpinned => {
                tracing::debug!(name = %target.name, "present and unpinned, leaving as-is");
                Ok(SyncOutcome::AlreadyCurrent)
            }
            WorkspaceState::PresentAtCommit => {
                tracing::info!("{} is already at the target commit", target.name);
                Ok(SyncOutcome::AlreadyCurrent)
            }
            WorkspaceState::PresentWrongCommit => self.update(target),
        }
    }

    /// Best-effort `git pull`. Failures are logged, never returned.
    pub fn pull(&self, path: &Path) {
        match self.git.pull(path) {
            Ok(result) => {
                tracing::info!("Pull successful in {}", path.display());
                if !result.stdout.trim().is_empty() {
                    tracing::debug!("{}", result.stdout.trim_end());
                }
            }
            Err(e) => tracing::warn!("Error pulling in {}: {e}", path.display()),
        }
    }

    /// Check out a branch, with its own single autofix budget.
    pub fn checkout_branch(&self, path: &Path, name: &str, branch: &str) -> Result<()> {
        let mut autofix = Autofix::new(name);
        autofix.attempt(
            &format!("checkout {branch}"),
            || self.git.checkout(path, name, branch),
            || self.repair(path, name),
        )
    }

    fn clone_fresh(&self, target: &RepositoryTarget) -> Result<SyncOutcome> {
        if let Some(parent) = target.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if let Err(e) = self.git.clone_repo(&target.url, &target.path, &target.name) {
            if target.path.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&target.path) {
                    tracing::warn!(
                        "Couldn't remove partial clone at {}: {cleanup}",
                        target.path.display()
                    );
                }
            }
            return Err(e);
        }

        if let Some(commit) = &target.commit {
            self.git.checkout(&target.path, &target.name, commit)?;
        }
        Ok(SyncOutcome::Cloned)
    }

    fn update(&self, target: &RepositoryTarget) -> Result<SyncOutcome> {
        let Some(commit) = target.commit.as_deref() else {
            return Ok(SyncOutcome::AlreadyCurrent);
        };
        let dir = target.path.as_path();
        let name = target.name.as_str();

        match self.git.origin_url(dir)? {
            Some(url) if url == target.url => {}
            current => {
                tracing::info!("Setting {name}'s origin URL to {}", target.url);
                self.git
                    .set_origin_url(dir, name, &target.url, current.is_some())?;
            }
        }

        let mut autofix = Autofix::new(name);
        autofix.attempt(
            "fetch",
            || self.git.fetch(dir, name),
            || self.repair(dir, name),
        )?;
        autofix.attempt(
            &format!("checkout {commit}"),
            || self.git.checkout(dir, name, commit),
            || self.repair(dir, name),
        )?;
        Ok(SyncOutcome::Updated)
    }

    fn repair(&self, dir: &Path, name: &str) -> Result<()> {
        self.git.refetch(dir, name)?;
        self.git.prune_aggressive(dir, name)
    }
}

fn is_absent(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if path.is_dir() {
        return Ok(fs::read_dir(path)?.next().is_none());
    }
    Ok(false)
}
