//! Git working copies: branch resolution, clone/update, and bounded repair.

mod autofix;
mod git;
mod resolver;
mod sync;

pub use autofix::Autofix;
pub use git::Git;
pub use resolver::{is_commit_id, CommitResolver};
pub use sync::{RepositorySynchronizer, RepositoryTarget, SyncOutcome, WorkspaceState};
