//! Error types for commitsmith modules using thiserror.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from opening or validating a repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not a git repository: {path}")]
    NotARepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Repository at {0} is bare (no working tree)")]
    Bare(PathBuf),

    #[error("Failed to open repository: {0}")]
    OpenFailed(#[source] git2::Error),
}

/// Errors from querying the change partitions or the staged diff.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Failed to read repository status: {0}")]
    StatusFailed(#[source] git2::Error),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),
}

/// What went wrong while talking to the text-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// No credential configured, or the backend rejected it.
    AuthMissing,
    /// The prompt is too large for the backend's context window.
    PayloadTooLarge,
    /// Network failure, timeout, rate limit or server-side error.
    Transient,
    /// Anything the backend did that we could not classify.
    Unknown,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::AuthMissing => "auth-missing",
            GenerationErrorKind::PayloadTooLarge => "payload-too-large",
            GenerationErrorKind::Transient => "transient",
            GenerationErrorKind::Unknown => "unknown",
        }
    }

    /// Only transient and unclassified failures may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationErrorKind::Transient | GenerationErrorKind::Unknown
        )
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from the message generator or its backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Text generation failed ({kind}): {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_missing(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::AuthMissing, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::PayloadTooLarge, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Transient, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unknown, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// One human-readable message per failure kind, for the front end.
    pub fn user_message(&self) -> String {
        match self.kind {
            GenerationErrorKind::AuthMissing => {
                "No valid API key for the text-generation backend. Set GROQ_API_KEY (or COMMITSMITH_API_KEY) in your environment or a .env file.".to_string()
            }
            GenerationErrorKind::PayloadTooLarge => {
                "The diff is too large for the text-generation backend. Stage fewer changes or lower --max-diff-chars and try again.".to_string()
            }
            GenerationErrorKind::Transient => {
                format!("The text-generation backend is unreachable right now: {}", self.message)
            }
            GenerationErrorKind::Unknown => {
                format!("The text-generation backend returned an unexpected error: {}", self.message)
            }
        }
    }
}

/// Errors from staging the user's selection.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("No files selected. Select at least one file to commit.")]
    NothingSelected,

    #[error("Failed to stage changes: {0}")]
    VcsFailure(String),
}

/// Errors from creating a commit.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Commit message is empty")]
    EmptyMessage,

    #[error("Nothing staged to commit")]
    NothingStaged,

    #[error("Failed to create commit: {0}")]
    VcsFailure(String),
}

/// Errors from pushing to the remote.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("No remote repository named 'origin' found")]
    NoRemote,

    #[error("Failed to push to remote repository: {0}")]
    VcsFailure(String),
}

/// Errors from session-level coordination.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A commit message is already being generated for this repository")]
    GenerationInProgress,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
