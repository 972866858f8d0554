//! Bounded generate-and-validate loop with a manual-entry fallback.

use tracing::{debug, info, warn};

use crate::commit::generator::MessageGenerator;
use crate::commit::message::{CommitMessage, Validator};
use crate::commit::payload::DiffPayload;
use crate::error::GenerationError;

/// States of the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Running attempt `n` (1-based).
    Attempting(u32),
    Success,
    /// Every attempt failed; the user decides whether to type a message.
    ExhaustedAwaitingManualChoice,
    /// The caller supplies the message; it is not validated.
    ManualEntry,
    Aborted,
}

/// Result of a full run of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Generated {
        message: CommitMessage,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        /// The last reply that failed validation, if any reply came back.
        last_reply: Option<String>,
    },
    Aborted(GenerationError),
}

impl RetryOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> RetryState {
        match self {
            RetryOutcome::Generated { .. } => RetryState::Success,
            RetryOutcome::Exhausted { .. } => RetryState::ExhaustedAwaitingManualChoice,
            RetryOutcome::Aborted(_) => RetryState::Aborted,
        }
    }
}

/// Drives the generator until a valid message comes back or attempts run out.
#[derive(Debug, Clone, Copy)]
pub struct RetryController {
    max_attempts: u32,
    validator: Validator,
}

impl RetryController {
    /// `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, extended_types: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            validator: Validator::new(extended_types),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run attempts back to back (no delay) until one validates.
    ///
    /// Invalid replies and retryable failures move on to the next attempt.
    /// A non-retryable failure aborts at once.
    pub async fn run(&self, generator: &MessageGenerator, payload: &DiffPayload) -> RetryOutcome {
        let mut state = RetryState::Attempting(1);
        let mut last_reply = None;

        while let RetryState::Attempting(n) = state {
            match generator.generate(payload).await {
                Ok(reply) => {
                    let parsed = self.validator.parse(&reply);
                    debug!(
                        attempt = n,
                        valid = parsed.is_some(),
                        raw_reply = %reply,
                        "Generation attempt finished"
                    );

                    if let Some(message) = parsed {
                        info!(attempts = n, "Generated a valid commit message");
                        return RetryOutcome::Generated {
                            message,
                            attempts: n,
                        };
                    }
                    warn!(
                        "Attempt {}/{}: reply does not match the commit format",
                        n, self.max_attempts
                    );
                    last_reply = Some(reply);
                }
                Err(e) if e.is_retryable() => {
                    warn!("Attempt {}/{} failed: {}", n, self.max_attempts, e);
                }
                Err(e) => {
                    warn!("Aborting generation: {}", e);
                    return RetryOutcome::Aborted(e);
                }
            }

            state = self.after_failed_attempt(n);
        }

        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_reply,
        }
    }

    fn after_failed_attempt(&self, n: u32) -> RetryState {
        if n < self.max_attempts {
            RetryState::Attempting(n + 1)
        } else {
            RetryState::ExhaustedAwaitingManualChoice
        }
    }
}

/// Resolve the manual-entry question asked after exhaustion.
pub fn resolve_manual_choice(enter_manually: bool) -> RetryState {
    if enter_manually {
        RetryState::ManualEntry
    } else {
        RetryState::Aborted
    }
}
