//! commitsmith - Generate conventional commit messages for staged changes.
//!
//! # Overview
//!
//! commitsmith classifies the pending changes of a git repository, stages the
//! user's selection, sends a size-bounded diff to an OpenAI-compatible
//! text-generation backend, validates the reply against a single-line
//! `type: description` grammar with bounded retries, and finally commits and
//! optionally pushes.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod session;

// Re-export commonly used types
pub use commit::{CommitId, CommitMessage, CommitType, DiffPayload, MessageGenerator, RetryController};
pub use config::{BackendConfig, PipelineConfig};
pub use error::{
    ClassificationError, CommitError, GenerationError, GenerationErrorKind, PushError,
    RepositoryError, SessionError, StageError,
};
pub use git::{ChangeEntry, ChangeStatus, RepositoryHandle};
pub use llm::{Completion, OpenAiCompatibleBackend, TextBackend};
pub use session::{GenerationOutcome, Session};
