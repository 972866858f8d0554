//! Pipeline limits and backend settings.
//!
//! Backend settings come from the environment (a `.env` file is loaded by the
//! binary before this runs). Pipeline limits have defaults that the CLI can
//! override.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Default character budget for the staged diff sent to the backend.
pub const DEFAULT_MAX_DIFF_CHARS: usize = 3000;

/// Default number of generation attempts before asking for manual entry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default number of changed files listed by the front end.
pub const DEFAULT_MAX_LISTED_FILES: usize = 50;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Credential variables, checked in order.
const API_KEY_ENV_VARS: [&str; 2] = ["GROQ_API_KEY", "COMMITSMITH_API_KEY"];
const MODEL_ENV_VAR: &str = "COMMITSMITH_MODEL";
const BASE_URL_ENV_VAR: &str = "COMMITSMITH_BASE_URL";
const TIMEOUT_ENV_VAR: &str = "COMMITSMITH_TIMEOUT";

/// Limits and feature flags for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Character cap applied to the staged diff.
    pub max_diff_chars: usize,
    /// Generation attempts before the manual-entry fallback.
    pub max_attempts: u32,
    /// Pair deleted/added paths into renames in diff queries.
    pub rename_detection: bool,
    /// Accept `rename` and `remove` in addition to the ten core types.
    pub extended_types: bool,
    /// How many changed files the front end lists.
    pub max_listed_files: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rename_detection: true,
            extended_types: true,
            max_listed_files: DEFAULT_MAX_LISTED_FILES,
        }
    }
}

/// Settings for the OpenAI-compatible text-generation backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

// Keep the credential out of debug output.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Read backend settings from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: get_api_key(),
            model: non_empty_var(MODEL_ENV_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty_var(BASE_URL_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: get_timeout(),
        }
    }
}

/// Get the API key, trying each credential variable in order.
fn get_api_key() -> Option<String> {
    API_KEY_ENV_VARS.iter().find_map(|name| non_empty_var(name))
}

/// Get the configured request timeout.
///
/// Logs a warning if the environment variable is set but is not a
/// non-negative integer.
fn get_timeout() -> Duration {
    match non_empty_var(TIMEOUT_ENV_VAR) {
        Some(v) => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
