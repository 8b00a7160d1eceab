//! Repository synchronization against real git and a local bare remote.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use launchprep::repository::{
    CommitResolver, Git, RepositorySynchronizer, RepositoryTarget, SyncOutcome, WorkspaceState,
};
use launchprep::shell::ProcessRunner;
use launchprep::ProvisionError;
use tempfile::TempDir;

/// Serialize tests that shell out to git.
static GIT_LOCK: Mutex<()> = Mutex::new(());

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Bare repo on `main` with one commit.
fn create_bare_repo(parent: &Path) -> PathBuf {
    let bare = parent.join("remote.git");
    git(
        parent,
        &["init", "--bare", "--initial-branch=main", bare.to_str().unwrap()],
    );
    push_commit(parent, &bare, "work", "first.txt");
    bare
}

/// Clone `bare` into `parent/<work>`, commit `file`, push, return the new tip.
fn push_commit(parent: &Path, bare: &Path, work: &str, file: &str) -> String {
    let work_dir = parent.join(work);
    git(parent, &["clone", bare.to_str().unwrap(), work_dir.to_str().unwrap()]);
    for (key, val) in [("user.name", "Test"), ("user.email", "test@test.com")] {
        git(&work_dir, &["config", key, val]);
    }
    std::fs::write(work_dir.join(file), file).unwrap();
    git(&work_dir, &["add", "."]);
    git(&work_dir, &["commit", "-m", file]);
    git(&work_dir, &["push", "origin", "HEAD:main"]);
    git(&work_dir, &["rev-parse", "HEAD"])
}

fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

#[test]
fn resolves_clones_and_stays_idempotent() {
    let _guard = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let bare = create_bare_repo(temp.path());
    let url = bare.to_string_lossy().into_owned();
    let runner = ProcessRunner::new(false);
    let sync = RepositorySynchronizer::new(&runner, "git");

    let tip = CommitResolver::new(sync.git())
        .resolve_branch_tip(&url, "main")
        .expect("tip of main");
    let checkout = temp.path().join("apps").join("companion");
    let target = RepositoryTarget::new(&url, &checkout, "companion").at_commit(&tip);

    assert_eq!(sync.inspect(&target).unwrap(), WorkspaceState::Absent);
    assert_eq!(sync.sync(&target).unwrap(), SyncOutcome::Cloned);
    assert_eq!(head(&checkout), tip);

    assert_eq!(sync.inspect(&target).unwrap(), WorkspaceState::PresentAtCommit);
    assert_eq!(sync.sync(&target).unwrap(), SyncOutcome::AlreadyCurrent);
}

#[test]
fn moves_existing_checkout_to_new_tip() {
    let _guard = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let bare = create_bare_repo(temp.path());
    let url = bare.to_string_lossy().into_owned();
    let runner = ProcessRunner::new(false);
    let sync = RepositorySynchronizer::new(&runner, "git");
    let checkout = temp.path().join("companion");

    let unpinned = RepositoryTarget::new(&url, &checkout, "companion");
    assert_eq!(sync.sync(&unpinned).unwrap(), SyncOutcome::Cloned);
    let old = head(&checkout);
    assert_eq!(old, git(&bare, &["rev-parse", "main"]));

    let new_tip = push_commit(temp.path(), &bare, "work2", "second.txt");
    assert_ne!(old, new_tip);

    // Unpinned never refreshes.
    assert_eq!(sync.sync(&unpinned).unwrap(), SyncOutcome::AlreadyCurrent);
    assert_eq!(head(&checkout), old);

    let pinned = unpinned.clone().at_commit(&new_tip);
    assert_eq!(sync.inspect(&pinned).unwrap(), WorkspaceState::PresentWrongCommit);
    assert_eq!(sync.sync(&pinned).unwrap(), SyncOutcome::Updated);
    assert_eq!(head(&checkout), new_tip);
    assert!(checkout.join("second.txt").exists());
}

#[test]
fn resolver_returns_none_for_missing_branch_and_remote() {
    let _guard = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let bare = create_bare_repo(temp.path());
    let runner = ProcessRunner::new(false);
    let git = Git::new(&runner, "git");
    let resolver = CommitResolver::new(&git);

    assert_eq!(
        resolver.resolve_branch_tip(&bare.to_string_lossy(), "no-such-branch"),
        None
    );
    let missing = temp.path().join("missing.git");
    assert_eq!(resolver.resolve_branch_tip(&missing.to_string_lossy(), "main"), None);
}

#[test]
fn resolver_returns_none_without_git() {
    let runner = ProcessRunner::new(false);
    let git = Git::new(&runner, "definitely-not-a-git-binary");
    assert_eq!(
        CommitResolver::new(&git).resolve_branch_tip("https://example.com/x.git", "main"),
        None
    );
}

#[test]
fn failed_clone_leaves_no_directory() {
    let _guard = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let runner = ProcessRunner::new(false);
    let sync = RepositorySynchronizer::new(&runner, "git");
    let checkout = temp.path().join("companion");
    let missing = temp.path().join("missing.git");

    let target = RepositoryTarget::new(missing.to_string_lossy(), &checkout, "companion");
    let err = sync.sync(&target).unwrap_err();

    assert!(matches!(err, ProvisionError::CommandFailed { .. }));
    assert!(!checkout.exists());
}

#[test]
fn plain_directory_is_not_a_repository() {
    let temp = TempDir::new().unwrap();
    let checkout = temp.path().join("companion");
    std::fs::create_dir_all(&checkout).unwrap();
    std::fs::write(checkout.join("notes.txt"), "hello").unwrap();
    let runner = ProcessRunner::new(false);
    let sync = RepositorySynchronizer::new(&runner, "git");

    let err = sync
        .sync(&RepositoryTarget::new("https://example.com/x.git", &checkout, "companion"))
        .unwrap_err();

    assert!(matches!(err, ProvisionError::NotARepository { .. }));
}
