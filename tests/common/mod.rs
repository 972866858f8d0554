//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use commitsmith::{Completion, GenerationError, RepositoryHandle, TextBackend};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    ///
    /// A local identity is configured so commits made through the library
    /// can resolve a signature.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open a library handle on this repository.
    pub fn handle(&self) -> RepositoryHandle {
        RepositoryHandle::open(self.path()).expect("Failed to open repository handle")
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file relative to the repository root, creating parent dirs.
    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, content).expect("Failed to write test file");
    }

    pub fn remove_file(&self, name: &str) {
        std::fs::remove_file(self.path().join(name)).expect("Failed to remove test file");
    }

    /// Add a path to the index.
    pub fn stage(&self, name: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Move a tracked file and stage both sides of the move.
    pub fn stage_rename(&self, old: &str, new: &str) {
        std::fs::rename(self.path().join(old), self.path().join(new))
            .expect("Failed to rename file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(old)).expect("Failed to remove old path");
        index.add_path(Path::new(new)).expect("Failed to add new path");
        index.write().expect("Failed to write index");
    }

    /// Commit whatever is in the index. Returns the commit OID.
    pub fn commit_index(&self, message: &str) -> Oid {
        let sig = self.signature();

        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        // Get parent commit if exists
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write, stage and commit a single file.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Oid {
        self.write_file(name, content);
        self.stage(name);
        self.commit_index(message)
    }

    /// Message of the commit HEAD points to.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .expect("No HEAD")
            .peel_to_commit()
            .expect("HEAD is not a commit")
            .message()
            .unwrap_or("")
            .to_string()
    }
}

/// Backend that replays canned replies in order and records every prompt.
///
/// Once the script runs out the last reply is repeated.
pub struct ScriptedBackend {
    replies: Vec<Result<String, GenerationError>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        Self {
            replies,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn complete(
        &self,
        prompt: &str,
        _model: &str,
        _credential: &str,
    ) -> Result<Completion, GenerationError> {
        let index = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        let reply = &self.replies[index.min(self.replies.len() - 1)];
        reply.clone().map(|text| Completion { text })
    }
}
