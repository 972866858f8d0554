//! Staging of the user's file selection.

use std::path::Path;

use git2::{Index, Repository};
use tracing::{debug, info};

use crate::error::StageError;
use crate::git::changes::{ChangeEntry, ChangeStatus};
use crate::git::repository::{RepositoryHandle, resolve_head_tree};

/// Reset the index to HEAD so nothing is staged (`git reset`).
///
/// Working tree files are left untouched. On a repository without commits
/// the index is simply cleared.
pub fn unstage_all(handle: &RepositoryHandle) -> Result<(), StageError> {
    let repo = handle.lock();
    reset_index(&repo)?;
    info!("All files have been unstaged");
    Ok(())
}

/// Stage the given entries on top of the current index.
pub fn stage_entries(handle: &RepositoryHandle, entries: &[ChangeEntry]) -> Result<(), StageError> {
    let repo = handle.lock();
    let mut index = repo.index().map_err(vcs_failure)?;

    for entry in entries {
        stage_entry(&repo, &mut index, entry)?;
    }

    index.write().map_err(vcs_failure)?;
    Ok(())
}

/// Make the staged partition equal the selection: unstage everything, then
/// stage exactly the selected entries.
pub fn stage_selection(
    handle: &RepositoryHandle,
    selection: &[ChangeEntry],
) -> Result<(), StageError> {
    if selection.is_empty() {
        return Err(StageError::NothingSelected);
    }

    let repo = handle.lock();
    reset_index(&repo)?;

    let mut index = repo.index().map_err(vcs_failure)?;
    for entry in selection {
        stage_entry(&repo, &mut index, entry)?;
    }
    index.write().map_err(vcs_failure)?;

    info!(count = selection.len(), "Staged selected files");
    Ok(())
}

fn reset_index(repo: &Repository) -> Result<(), StageError> {
    let mut index = repo.index().map_err(vcs_failure)?;
    match resolve_head_tree(repo).map_err(vcs_failure)? {
        Some(tree) => index.read_tree(&tree).map_err(vcs_failure)?,
        None => index.clear().map_err(vcs_failure)?,
    }
    index.write().map_err(vcs_failure)
}

fn stage_entry(repo: &Repository, index: &mut Index, entry: &ChangeEntry) -> Result<(), StageError> {
    if entry.status == ChangeStatus::Renamed {
        debug!("Staging rename {}", entry.label());
        remove_if_tracked(index, &entry.path)?;
    }
    stage_path(repo, index, entry.current_path())
}

/// Add a path, or record its deletion if it is gone from the working tree.
fn stage_path(repo: &Repository, index: &mut Index, path: &str) -> Result<(), StageError> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| StageError::VcsFailure("repository has no working tree".to_string()))?;

    if workdir.join(path).exists() {
        debug!("Staging file: {}", path);
        index.add_path(Path::new(path)).map_err(vcs_failure)
    } else {
        debug!("Staging deletion: {}", path);
        remove_if_tracked(index, path)
    }
}

fn remove_if_tracked(index: &mut Index, path: &str) -> Result<(), StageError> {
    if index.get_path(Path::new(path), 0).is_some() {
        index.remove_path(Path::new(path)).map_err(vcs_failure)?;
    }
    Ok(())
}

fn vcs_failure(e: git2::Error) -> StageError {
    StageError::VcsFailure(e.message().to_string())
}
