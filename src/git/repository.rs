//! The repository handle shared by every pipeline component.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use git2::{ErrorCode, Repository, Tree};
use tracing::{debug, info};

use crate::error::{ClassificationError, RepositoryError};

/// An open, non-bare repository.
///
/// libgit2 handles are not thread-safe, so the repository sits behind a
/// mutex. Every query, staging and commit operation takes the lock, which
/// also keeps two staging/commit operations from interleaving on the same
/// handle.
pub struct RepositoryHandle {
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl RepositoryHandle {
    /// Open the repository containing `path`, searching parent directories.
    ///
    /// Bare repositories are rejected: they have no working tree to classify.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                RepositoryError::NotARepository {
                    path: path.to_path_buf(),
                    source: e,
                }
            } else {
                RepositoryError::OpenFailed(e)
            }
        })?;

        Self::from_repository(repo)
    }

    /// Wrap an already-open repository.
    pub fn from_repository(repo: Repository) -> Result<Self, RepositoryError> {
        if repo.is_bare() {
            return Err(RepositoryError::Bare(repo.path().to_path_buf()));
        }

        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| RepositoryError::Bare(repo.path().to_path_buf()))?;

        info!(workdir = %workdir.display(), "Opened repository");

        Ok(Self {
            repo: Mutex::new(repo),
            workdir,
        })
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Acquire the per-handle lock.
    ///
    /// A panic while holding the lock cannot leave libgit2 in a state we can
    /// detect, so a poisoned lock is simply reused.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a remote with the given name is configured.
    pub fn has_remote(&self, name: &str) -> bool {
        self.lock().find_remote(name).is_ok()
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD.
pub(crate) fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, git2::Error> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            debug!("HEAD is unborn, diffing against the empty tree");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    Ok(Some(head_ref.peel_to_tree()?))
}

/// Fail fast on a repository that lost its working tree.
pub(crate) fn ensure_not_bare(repo: &Repository) -> Result<(), ClassificationError> {
    if repo.is_bare() {
        return Err(RepositoryError::Bare(repo.path().to_path_buf()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_discovers_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let handle = RepositoryHandle::open(&nested).unwrap();
        assert_eq!(
            handle.workdir().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_open_rejects_bare_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();

        let result = RepositoryHandle::open(dir.path());
        assert!(matches!(result, Err(RepositoryError::Bare(_))));
    }

    #[test]
    fn test_open_outside_repository_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = RepositoryHandle::open(dir.path());
        assert!(
            matches!(result, Err(RepositoryError::NotARepository { .. })),
            "Expected NotARepository, got: {:?}",
            result
        );
    }

    #[test]
    fn test_has_remote() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://example.com/repo.git").unwrap();

        let handle = RepositoryHandle::from_repository(repo).unwrap();
        assert!(handle.has_remote("origin"));
        assert!(!handle.has_remote("upstream"));
    }

    #[test]
    fn test_resolve_head_tree_unborn_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(resolve_head_tree(&repo).unwrap().is_none());
    }
}
