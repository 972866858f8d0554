//! End-to-end tests: classify, stage, generate through a scripted backend,
//! validate and commit.

mod common;

use std::sync::Arc;

use common::{ScriptedBackend, TestRepo};
use commitsmith::MessageGenerator;
use commitsmith::commit::{RetryController, RetryOutcome, RetryState, commit, prepare_payload};
use commitsmith::config::{BackendConfig, PipelineConfig};
use commitsmith::error::{CommitError, GenerationError, GenerationErrorKind};
use commitsmith::git::{Partition, classify_changes, list_changes, stage_selection};

fn backend_config() -> BackendConfig {
    BackendConfig {
        api_key: Some("test-key".to_string()),
        ..BackendConfig::default()
    }
}

#[tokio::test]
async fn test_rename_and_new_readme_end_to_end() {
    let repo = TestRepo::new();
    repo.commit_file(
        "old.py",
        "def main():\n    print('hello')\n\nmain()\n",
        "feat: add script",
    );
    repo.stage_rename("old.py", "new.py");
    repo.write_file("README.md", "# Project\n\nA tiny script.\n");

    let handle = repo.handle();
    let config = PipelineConfig {
        max_diff_chars: 5000,
        ..PipelineConfig::default()
    };

    let entries = classify_changes(&handle, config.rename_detection).unwrap();
    assert_eq!(entries.len(), 2);

    stage_selection(&handle, &entries).unwrap();

    let payload = prepare_payload(&handle, &config).unwrap();
    assert!(!payload.is_empty());
    assert!(!payload.truncated);
    assert!(payload.text.contains("README.md"));

    let backend = Arc::new(ScriptedBackend::replying(
        "rename: move old.py to new.py and add README.md",
    ));
    let generator = MessageGenerator::new(backend.clone(), &backend_config(), true);
    let outcome = RetryController::new(config.max_attempts, config.extended_types)
        .run(&generator, &payload)
        .await;

    let message = match outcome {
        RetryOutcome::Generated { message, attempts } => {
            assert_eq!(attempts, 1);
            message
        }
        other => panic!("expected a generated message, got {other:?}"),
    };
    assert_eq!(backend.calls(), 1);
    assert!(backend.prompts()[0].ends_with(&payload.text));

    commit(&handle, &message.to_string()).unwrap();
    assert_eq!(
        repo.head_message(),
        "rename: move old.py to new.py and add README.md"
    );
    assert!(classify_changes(&handle, true).unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_replies_exhaust_then_manual_entry_commits() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "chore: init");
    repo.write_file("a.txt", "b\n");
    repo.stage("a.txt");

    let handle = repo.handle();
    let payload = prepare_payload(&handle, &PipelineConfig::default()).unwrap();

    let backend = Arc::new(ScriptedBackend::replying("Sure! Here is a commit message."));
    let generator = MessageGenerator::new(backend.clone(), &backend_config(), true);
    let outcome = RetryController::new(3, true).run(&generator, &payload).await;

    assert_eq!(outcome.state(), RetryState::ExhaustedAwaitingManualChoice);
    assert_eq!(backend.calls(), 3);

    // The manual message bypasses validation.
    commit(&handle, "Update a.txt by hand").unwrap();
    assert_eq!(repo.head_message(), "Update a.txt by hand");
}

#[tokio::test]
async fn test_auth_failure_aborts_after_first_call() {
    let repo = TestRepo::new();
    repo.write_file("a.txt", "a\n");
    repo.stage("a.txt");

    let handle = repo.handle();
    let payload = prepare_payload(&handle, &PipelineConfig::default()).unwrap();

    let backend = Arc::new(ScriptedBackend::new(vec![Err(GenerationError::auth_missing(
        "HTTP 401: invalid api key",
    ))]));
    let generator = MessageGenerator::new(backend.clone(), &backend_config(), true);
    let outcome = RetryController::new(3, true).run(&generator, &payload).await;

    match outcome {
        RetryOutcome::Aborted(e) => assert_eq!(e.kind, GenerationErrorKind::AuthMissing),
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_missing_api_key_never_reaches_backend() {
    let repo = TestRepo::new();
    repo.write_file("a.txt", "a\n");
    repo.stage("a.txt");
    let payload = prepare_payload(&repo.handle(), &PipelineConfig::default()).unwrap();

    let backend = Arc::new(ScriptedBackend::replying("feat: add a"));
    let generator = MessageGenerator::new(backend.clone(), &BackendConfig::default(), true);
    let outcome = RetryController::new(3, true).run(&generator, &payload).await;

    assert_eq!(outcome.state(), RetryState::Aborted);
    assert_eq!(backend.calls(), 0);
}

#[test]
fn test_failed_commit_leaves_changes_staged() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "chore: init");
    repo.write_file("a.txt", "b\n");
    repo.stage("a.txt");

    let handle = repo.handle();
    assert!(matches!(commit(&handle, "  \n"), Err(CommitError::EmptyMessage)));

    let staged = list_changes(&handle, Partition::Staged, true).unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(repo.head_message(), "chore: init");
}
