//! Unified diff text of the staged partition using git2.

use git2::{DiffFindOptions, DiffFormat};
use tracing::{debug, warn};

use crate::error::ClassificationError;
use crate::git::repository::{RepositoryHandle, ensure_not_bare, resolve_head_tree};

/// Collect the staged changes (HEAD vs index) as one unified diff.
///
/// Equivalent to `git diff --cached -M --pretty=format:`: every file block
/// starts with its `diff --git` header and no commit metadata is emitted.
/// With `rename_detection` off, a move shows up as a delete plus an add.
pub fn staged_diff(
    handle: &RepositoryHandle,
    rename_detection: bool,
) -> Result<String, ClassificationError> {
    let repo = handle.lock();
    ensure_not_bare(&repo)?;

    let head_tree = resolve_head_tree(&repo).map_err(ClassificationError::DiffFailed)?;
    let mut diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(ClassificationError::DiffFailed)?;

    if rename_detection {
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(ClassificationError::DiffFailed)?;
    }

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());

        // Include the origin character for content lines
        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&content);

        true
    })
    .map_err(|e| {
        warn!("Failed to render staged diff: {e}");
        ClassificationError::DiffFailed(e)
    })?;

    debug!(
        files = diff.deltas().len(),
        chars = text.chars().count(),
        "Collected staged diff"
    );

    Ok(text)
}
