//! Change classification across the staged, unstaged and untracked partitions.

use std::collections::HashSet;
use std::fmt;

use git2::{Delta, Diff, DiffFindOptions, DiffOptions, Repository, Status, StatusOptions};
use tracing::{debug, info};

use crate::error::ClassificationError;
use crate::git::repository::{RepositoryHandle, ensure_not_bare, resolve_head_tree};

/// Status tag of a classified change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Staged,
    Unstaged,
    Untracked,
    Renamed,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Staged => "staged",
            ChangeStatus::Unstaged => "unstaged",
            ChangeStatus::Untracked => "untracked",
            ChangeStatus::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three independent change queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// HEAD tree vs index.
    Staged,
    /// Index vs working tree.
    Unstaged,
    /// Files git does not track yet.
    Untracked,
}

/// A single classified change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    /// The path, or the old path for renames.
    pub path: String,
    /// The new path for renames.
    pub secondary_path: Option<String>,
    pub status: ChangeStatus,
}

impl ChangeEntry {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            secondary_path: None,
            status,
        }
    }

    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            path: old_path.into(),
            secondary_path: Some(new_path.into()),
            status: ChangeStatus::Renamed,
        }
    }

    /// The path that exists in the working tree after this change.
    pub fn current_path(&self) -> &str {
        self.secondary_path.as_deref().unwrap_or(&self.path)
    }

    /// Display label: `old -> new` for renames, the path otherwise.
    pub fn label(&self) -> String {
        match &self.secondary_path {
            Some(new_path) => format!("{} -> {}", self.path, new_path),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label(), self.status)
    }
}

/// Classify every pending change in the repository.
///
/// Staged entries come first, then unstaged, then untracked. A path reported
/// by an earlier partition is not repeated by a later one, and the new side
/// of a rename is never listed again as untracked.
pub fn classify_changes(
    handle: &RepositoryHandle,
    rename_detection: bool,
) -> Result<Vec<ChangeEntry>, ClassificationError> {
    let repo = handle.lock();
    ensure_not_bare(&repo)?;

    let staged = query_staged(&repo, rename_detection)?;
    let unstaged = query_unstaged(&repo, rename_detection)?;
    let untracked = query_untracked(&repo)?;

    info!(
        staged = staged.len(),
        unstaged = unstaged.len(),
        untracked = untracked.len(),
        "Retrieved changed files"
    );

    Ok(merge_partitions(staged, unstaged, untracked))
}

/// List the changes of a single partition.
pub fn list_changes(
    handle: &RepositoryHandle,
    partition: Partition,
    rename_detection: bool,
) -> Result<Vec<ChangeEntry>, ClassificationError> {
    let repo = handle.lock();
    ensure_not_bare(&repo)?;

    match partition {
        Partition::Staged => query_staged(&repo, rename_detection),
        Partition::Unstaged => query_unstaged(&repo, rename_detection),
        Partition::Untracked => query_untracked(&repo),
    }
}

/// Concatenate the partitions in order, dropping paths already seen.
fn merge_partitions(
    staged: Vec<ChangeEntry>,
    unstaged: Vec<ChangeEntry>,
    untracked: Vec<ChangeEntry>,
) -> Vec<ChangeEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(staged.len() + unstaged.len() + untracked.len());

    for entry in staged.into_iter().chain(unstaged).chain(untracked) {
        let paths: Vec<&str> = std::iter::once(entry.path.as_str())
            .chain(entry.secondary_path.as_deref())
            .collect();

        if paths.iter().any(|p| seen.contains(*p)) {
            debug!("Skipping {} already reported by an earlier partition", entry.label());
            continue;
        }

        seen.extend(paths.into_iter().map(str::to_string));
        merged.push(entry);
    }

    merged
}

pub(crate) fn query_staged(
    repo: &Repository,
    rename_detection: bool,
) -> Result<Vec<ChangeEntry>, ClassificationError> {
    let head_tree = resolve_head_tree(repo).map_err(ClassificationError::DiffFailed)?;

    let mut diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(ClassificationError::DiffFailed)?;

    if rename_detection {
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(ClassificationError::DiffFailed)?;
    }

    Ok(entries_from_diff(&diff, ChangeStatus::Staged))
}

fn query_unstaged(
    repo: &Repository,
    rename_detection: bool,
) -> Result<Vec<ChangeEntry>, ClassificationError> {
    let mut opts = DiffOptions::new();
    // Untracked files only take part as rename targets; they are listed by
    // the untracked query.
    opts.include_untracked(rename_detection)
        .recurse_untracked_dirs(rename_detection);

    let mut diff = repo
        .diff_index_to_workdir(None, Some(&mut opts))
        .map_err(ClassificationError::DiffFailed)?;

    if rename_detection {
        let mut find = DiffFindOptions::new();
        find.renames(true).for_untracked(true);
        diff.find_similar(Some(&mut find))
            .map_err(ClassificationError::DiffFailed)?;
    }

    Ok(entries_from_diff(&diff, ChangeStatus::Unstaged))
}

fn query_untracked(repo: &Repository) -> Result<Vec<ChangeEntry>, ClassificationError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(ClassificationError::StatusFailed)?;

    Ok(statuses
        .iter()
        .filter(|s| s.status().contains(Status::WT_NEW))
        .filter_map(|s| s.path().map(str::to_string))
        .map(|path| ChangeEntry::new(path, ChangeStatus::Untracked))
        .collect())
}

/// Convert diff deltas into entries, collapsing renames into one entry.
fn entries_from_diff(diff: &Diff<'_>, status: ChangeStatus) -> Vec<ChangeEntry> {
    diff.deltas()
        .filter_map(|delta| {
            let new_path = delta
                .new_file()
                .path()
                .map(|p| p.to_string_lossy().to_string());
            let old_path = delta
                .old_file()
                .path()
                .map(|p| p.to_string_lossy().to_string());

            match delta.status() {
                Delta::Renamed => match (old_path, new_path) {
                    (Some(old), Some(new)) => Some(ChangeEntry::renamed(old, new)),
                    (old, new) => old.or(new).map(|p| ChangeEntry::new(p, status)),
                },
                Delta::Untracked | Delta::Ignored | Delta::Unmodified => None,
                _ => old_path
                    .or(new_path)
                    .filter(|p| !p.is_empty())
                    .map(|p| ChangeEntry::new(p, status)),
            }
        })
        .collect()
}
