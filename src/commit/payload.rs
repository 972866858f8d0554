//! Size-bounded diff payloads for the text-generation backend.

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::ClassificationError;
use crate::git::{RepositoryHandle, staged_diff};

/// Marker that opens every per-file block of a unified diff.
const FILE_DIFF_MARKER: &str = "diff --git ";

/// A diff ready to be embedded in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPayload {
    pub text: String,
    /// Whether whole file blocks were dropped, or the single kept block is
    /// larger than the cap.
    pub truncated: bool,
    pub size_bytes: usize,
}

impl DiffPayload {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Collect the staged diff and bound it to the configured size.
pub fn prepare_payload(
    handle: &RepositoryHandle,
    config: &PipelineConfig,
) -> Result<DiffPayload, ClassificationError> {
    let raw = staged_diff(handle, config.rename_detection)?;
    let payload = limit_diff(&raw, config.max_diff_chars);

    info!(
        chars = payload.text.chars().count(),
        truncated = payload.truncated,
        "Retrieved staged diff"
    );
    if payload.truncated {
        warn!(
            "Diff exceeds {} characters and was truncated at a file boundary",
            config.max_diff_chars
        );
    }

    Ok(payload)
}

/// Bound a unified diff to `max_chars` characters without splitting a file.
///
/// The diff is cut into segments, each starting at a `diff --git ` line
/// (text before the first marker is a segment of its own). Whole segments are
/// kept in order while the total stays within the cap. If even the first
/// segment is over the cap it is kept on its own, so the result is never
/// empty for a non-empty diff; `truncated` is then set as well.
pub fn limit_diff(raw: &str, max_chars: usize) -> DiffPayload {
    if raw.chars().count() <= max_chars {
        return DiffPayload {
            text: raw.to_string(),
            truncated: false,
            size_bytes: raw.len(),
        };
    }

    let mut text = String::new();
    let mut used = 0usize;

    for segment in split_segments(raw) {
        let len = segment.chars().count();
        if used + len > max_chars {
            if text.is_empty() {
                text.push_str(segment);
            }
            break;
        }
        text.push_str(segment);
        used += len;
    }

    DiffPayload {
        truncated: text.len() < raw.len() || text.chars().count() > max_chars,
        size_bytes: text.len(),
        text,
    }
}

/// Split a unified diff at every line that starts a file block.
///
/// The segments concatenate back to the input exactly.
pub fn split_segments(raw: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = Vec::new();
    if raw.starts_with(FILE_DIFF_MARKER) {
        starts.push(0);
    }
    starts.extend(
        raw.match_indices(&format!("\n{FILE_DIFF_MARKER}"))
            .map(|(idx, _)| idx + 1),
    );

    let mut segments = Vec::with_capacity(starts.len() + 1);
    let mut prev = 0;
    for start in starts {
        if start > prev {
            segments.push(&raw[prev..start]);
        }
        prev = start;
    }
    if prev < raw.len() {
        segments.push(&raw[prev..]);
    }
    segments
}
