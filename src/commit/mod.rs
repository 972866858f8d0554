//! From staged diff to commit: payload, prompt, generation, validation,
//! retries and the final commit/push.

pub mod executor;
pub mod generator;
pub mod message;
pub mod payload;
pub mod prompt;
pub mod retry;

pub use executor::{CommitId, PUSH_REMOTE, commit, push};
pub use generator::MessageGenerator;
pub use message::{CommitMessage, CommitType, Validator, is_valid};
pub use payload::{DiffPayload, limit_diff, prepare_payload};
pub use prompt::build_commit_prompt;
pub use retry::{RetryController, RetryOutcome, RetryState, resolve_manual_choice};
