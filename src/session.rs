//! The interactive session: one live repository and at most one background
//! generation at a time.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::commit::{CommitMessage, MessageGenerator, RetryController, RetryOutcome, prepare_payload};
use crate::config::PipelineConfig;
use crate::error::{ClassificationError, GenerationError, SessionError};
use crate::git::RepositoryHandle;

/// Event sent by the background generation task. Exactly one per request.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// A message that passed validation.
    Ready {
        message: CommitMessage,
        truncated: bool,
        attempts: u32,
    },
    /// Attempts ran out; the front end asks whether to enter one manually.
    Exhausted {
        attempts: u32,
        last_reply: Option<String>,
    },
    /// A failure that retrying cannot fix.
    Aborted(GenerationError),
    /// The staged diff is empty, the backend was not contacted.
    NothingStaged,
    /// The staged diff could not be read.
    Failed(ClassificationError),
}

/// Clears the in-flight flag when the generation task ends, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session {
    handle: Mutex<Arc<RepositoryHandle>>,
    in_flight: Arc<AtomicBool>,
    generator: Arc<MessageGenerator>,
    controller: RetryController,
    config: PipelineConfig,
}

impl Session {
    /// Open the repository containing `path`.
    ///
    /// `generator` should offer the same type set as `config.extended_types`,
    /// otherwise the validator rejects types the prompt allowed.
    pub fn open(
        path: impl AsRef<Path>,
        config: PipelineConfig,
        generator: MessageGenerator,
    ) -> Result<Self, SessionError> {
        let handle = RepositoryHandle::open(path)?;
        Ok(Self::with_handle(handle, config, generator))
    }

    pub fn with_handle(
        handle: RepositoryHandle,
        config: PipelineConfig,
        generator: MessageGenerator,
    ) -> Self {
        Self {
            handle: Mutex::new(Arc::new(handle)),
            in_flight: Arc::new(AtomicBool::new(false)),
            generator: Arc::new(generator),
            controller: RetryController::new(config.max_attempts, config.extended_types),
            config,
        }
    }

    /// The live repository handle.
    pub fn handle(&self) -> Arc<RepositoryHandle> {
        Arc::clone(&self.current())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether a background generation is outstanding.
    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Replace the live handle with the repository containing `path`.
    ///
    /// The old handle stays valid for whoever still holds it.
    pub fn switch_repository(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let new_handle = Arc::new(RepositoryHandle::open(path)?);

        let mut current = self.current();
        if self.is_generating() {
            return Err(SessionError::GenerationInProgress);
        }
        *current = new_handle;

        info!(workdir = %current.workdir().display(), "Switched repository");
        Ok(())
    }

    /// Start generating a message for the staged changes in the background.
    ///
    /// The outcome arrives on `tx`. Must be called from within a tokio
    /// runtime. Rejected while a previous request is still running.
    pub fn request_generation(
        &self,
        tx: mpsc::UnboundedSender<GenerationOutcome>,
    ) -> Result<JoinHandle<()>, SessionError> {
        let handle = {
            let current = self.current();
            if self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(SessionError::GenerationInProgress);
            }
            Arc::clone(&current)
        };

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let generator = Arc::clone(&self.generator);
        let controller = self.controller;
        let config = self.config.clone();

        Ok(tokio::spawn(async move {
            let outcome = run_generation(handle, config, &generator, controller).await;
            // Release before sending so the receiver can request again at once.
            drop(guard);
            if tx.send(outcome).is_err() {
                debug!("Generation outcome dropped, receiver is gone");
            }
        }))
    }

    fn current(&self) -> MutexGuard<'_, Arc<RepositoryHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_generation(
    handle: Arc<RepositoryHandle>,
    config: PipelineConfig,
    generator: &MessageGenerator,
    controller: RetryController,
) -> GenerationOutcome {
    let prepared = tokio::task::spawn_blocking(move || prepare_payload(&handle, &config)).await;

    let payload = match prepared {
        Ok(Ok(payload)) => payload,
        Ok(Err(e)) => return GenerationOutcome::Failed(e),
        Err(e) => {
            return GenerationOutcome::Aborted(GenerationError::unknown(format!(
                "Diff preparation task failed: {e}"
            )));
        }
    };

    if payload.is_empty() {
        info!("No staged changes, skipping generation");
        return GenerationOutcome::NothingStaged;
    }

    match controller.run(generator, &payload).await {
        RetryOutcome::Generated { message, attempts } => GenerationOutcome::Ready {
            message,
            truncated: payload.truncated,
            attempts,
        },
        RetryOutcome::Exhausted {
            attempts,
            last_reply,
        } => GenerationOutcome::Exhausted {
            attempts,
            last_reply,
        },
        RetryOutcome::Aborted(e) => GenerationOutcome::Aborted(e),
    }
}
