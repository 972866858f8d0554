//! Commit the staged changes and push them to `origin`.
//!
//! Commits go through libgit2. Pushing shells out to the system `git` binary so
//! the user's SSH agent and credential helpers apply.

use std::fmt;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, ErrorCode, Oid, Repository};
use tracing::{debug, info};

use crate::error::{CommitError, PushError};
use crate::git::RepositoryHandle;
use crate::git::changes::query_staged;

/// Remote that `push` publishes to.
pub const PUSH_REMOTE: &str = "origin";

/// Identifier of a freshly created commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitId {
    pub oid: Oid,
    pub committed_at: DateTime<Utc>,
}

impl CommitId {
    /// Seven-character abbreviated hash.
    pub fn short(&self) -> String {
        self.oid.to_string().chars().take(7).collect()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Commit the index on top of HEAD with the repository's configured identity.
///
/// The message is trimmed before use. On failure the index is left as it was,
/// so the staged changes stay staged.
pub fn commit(handle: &RepositoryHandle, message: &str) -> Result<CommitId, CommitError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(CommitError::EmptyMessage);
    }

    let repo = handle.lock();

    let staged = query_staged(&repo, false).map_err(|e| CommitError::VcsFailure(e.to_string()))?;
    if staged.is_empty() {
        return Err(CommitError::NothingStaged);
    }

    let mut index = repo.index().map_err(vcs_failure)?;
    let tree_id = index.write_tree().map_err(vcs_failure)?;
    let tree = repo.find_tree(tree_id).map_err(vcs_failure)?;
    let signature = repo.signature().map_err(vcs_failure)?;

    let parent = head_commit(&repo).map_err(vcs_failure)?;
    let parents: Vec<&Commit> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .map_err(vcs_failure)?;

    let committed_at = Utc
        .timestamp_opt(signature.when().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    let id = CommitId { oid, committed_at };
    info!(commit = %id, files = staged.len(), "Created commit");
    Ok(id)
}

/// Push the current branch to `origin`.
///
/// Only meaningful after a successful commit. A failed push does not undo
/// the commit.
pub fn push(handle: &RepositoryHandle) -> Result<(), PushError> {
    if !handle.has_remote(PUSH_REMOTE) {
        return Err(PushError::NoRemote);
    }

    if which::which("git").is_err() {
        return Err(PushError::VcsFailure(
            "git binary not found in PATH".to_string(),
        ));
    }

    run_git(handle.workdir(), &["push", PUSH_REMOTE, "HEAD"], "push")
        .map_err(PushError::VcsFailure)?;

    info!(remote = PUSH_REMOTE, "Pushed changes");
    Ok(())
}

/// The commit HEAD points to, or `None` on an unborn branch.
fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            debug!("HEAD is unborn, creating a root commit");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run a git command in `workdir`, returning stderr on failure.
fn run_git(workdir: &Path, args: &[&str], operation: &str) -> Result<(), String> {
    debug!(?args, "Running git");

    let output = Command::new("git")
        .arg("-C")
        .arg(workdir)
        .args(args)
        .output()
        .map_err(|e| format!("Failed to run git {}: {}", operation, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", operation, stderr.trim()));
    }

    Ok(())
}

fn vcs_failure(e: git2::Error) -> CommitError {
    CommitError::VcsFailure(e.message().to_string())
}
