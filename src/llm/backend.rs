//! The text-generation backend seam.

use async_trait::async_trait;

use crate::error::GenerationError;

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

/// Trait for text-generation backends.
///
/// This abstraction allows mocking the backend in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Submit `prompt` as a single user message and return the first reply.
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        credential: &str,
    ) -> Result<Completion, GenerationError>;
}
