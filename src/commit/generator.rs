//! Turns a diff payload into a raw commit message candidate.

use std::sync::Arc;

use tracing::debug;

use crate::commit::message::CommitType;
use crate::commit::payload::DiffPayload;
use crate::commit::prompt::build_commit_prompt;
use crate::config::BackendConfig;
use crate::error::GenerationError;
use crate::llm::TextBackend;

/// Asks the text-generation backend for a commit message.
///
/// The reply is returned as-is apart from trimming; validation is the retry
/// controller's job.
pub struct MessageGenerator {
    backend: Arc<dyn TextBackend>,
    model: String,
    credential: Option<String>,
    types: &'static [CommitType],
}

impl MessageGenerator {
    pub fn new(backend: Arc<dyn TextBackend>, config: &BackendConfig, extended_types: bool) -> Self {
        Self {
            backend,
            model: config.model.clone(),
            credential: config.api_key.clone(),
            types: CommitType::allowed(extended_types),
        }
    }

    /// Generate one candidate for the given diff.
    ///
    /// Fails with `AuthMissing` without contacting the backend when no
    /// credential is configured.
    pub async fn generate(&self, diff: &DiffPayload) -> Result<String, GenerationError> {
        let credential = self
            .credential
            .as_deref()
            .ok_or_else(|| GenerationError::auth_missing("No API key configured"))?;

        let prompt = build_commit_prompt(diff, self.types);
        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Requesting commit message"
        );

        let completion = self.backend.complete(&prompt, &self.model, credential).await?;
        Ok(completion.text.trim().to_string())
    }
}
