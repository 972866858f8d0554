//! commitsmith - CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dialoguer::{Confirm, Input, MultiSelect};
use tokio::sync::mpsc;
use tracing::debug;

use commitsmith::commit::{RetryState, commit, prepare_payload, push, resolve_manual_choice};
use commitsmith::config::{BackendConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DIFF_CHARS, PipelineConfig};
use commitsmith::git::{ChangeEntry, RepositoryHandle, classify_changes, stage_selection};
use commitsmith::{GenerationOutcome, MessageGenerator, OpenAiCompatibleBackend, Session};

/// Generate conventional commit messages for your changes.
#[derive(Parser, Debug)]
#[command(name = "commitsmith")]
#[command(about = "Generate conventional commit messages for your changes")]
#[command(version)]
struct Cli {
    /// Repository path (any directory inside the working tree)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Stage every changed file without asking
    #[arg(short, long)]
    all: bool,

    /// Commit with the generated message
    #[arg(short, long)]
    commit: bool,

    /// Push to origin after committing
    #[arg(short, long, requires = "commit")]
    push: bool,

    /// Accept the generated message without editing it
    #[arg(short, long)]
    yes: bool,

    /// Character budget for the diff sent to the model
    #[arg(long, default_value_t = DEFAULT_MAX_DIFF_CHARS)]
    max_diff_chars: usize,

    /// Generation attempts before falling back to manual entry
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Model identifier (overrides COMMITSMITH_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Disable rename detection
    #[arg(long)]
    no_renames: bool,

    /// Only allow the ten core commit types (no rename/remove)
    #[arg(long)]
    core_types: bool,

    /// Print the staged diff as it would be sent, then exit
    #[arg(long)]
    show_diff: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_diff_chars: self.max_diff_chars,
            max_attempts: self.max_attempts,
            rename_detection: !self.no_renames,
            extended_types: !self.core_types,
            ..PipelineConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let pipeline = cli.pipeline_config();
    let mut backend_config = BackendConfig::from_env();
    if let Some(model) = &cli.model {
        backend_config.model = model.clone();
    }
    debug!(?pipeline, ?backend_config, "Loaded configuration");

    let backend = OpenAiCompatibleBackend::new(&backend_config)
        .context("Failed to set up the text-generation backend")?;
    let generator =
        MessageGenerator::new(Arc::new(backend), &backend_config, pipeline.extended_types);

    let session = Session::open(&cli.path, pipeline, generator).with_context(|| {
        format!(
            "Not a git repository: {}. Run commitsmith from within a git working tree.",
            cli.path.display()
        )
    })?;
    let handle = session.handle();
    let config = session.config().clone();

    if cli.show_diff {
        return show_diff(&handle, &config);
    }

    // Step 1: Classify
    let entries =
        classify_changes(&handle, config.rename_detection).context("Failed to list changed files")?;

    if entries.is_empty() {
        println!("No changes detected.");
        return Ok(());
    }

    print_entries(&entries, config.max_listed_files);

    // Step 2: Select and stage
    let selection = if cli.all {
        entries
    } else {
        select_entries(&entries)?
    };

    if selection.is_empty() {
        println!("No files selected. Nothing to commit.");
        return Ok(());
    }

    stage_selection(&handle, &selection).context("Failed to stage the selected files")?;

    // Step 3: Generate in the background
    println!("Generating commit message...");
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.request_generation(tx)?;
    let outcome = rx
        .recv()
        .await
        .context("Generation ended without a result")?;

    let message = match outcome {
        GenerationOutcome::Ready {
            message,
            truncated,
            attempts,
        } => {
            debug!(attempts, "Generation finished");
            if truncated {
                eprintln!(
                    "Warning: the diff exceeded {} characters and was truncated. The message may not cover every change.",
                    config.max_diff_chars
                );
            }
            if cli.yes {
                message.to_string()
            } else {
                edit_message(&message.to_string())?
            }
        }
        GenerationOutcome::Exhausted {
            attempts,
            last_reply,
        } => {
            eprintln!("Could not generate a valid commit message after {attempts} attempts.");
            if let Some(reply) = last_reply {
                eprintln!("Last reply: {reply}");
            }
            match ask_manual_entry(cli.yes)? {
                RetryState::ManualEntry => read_manual_message()?,
                _ => bail!("No commit message. Aborted."),
            }
        }
        GenerationOutcome::Aborted(e) => bail!(e.user_message()),
        GenerationOutcome::NothingStaged => {
            println!("No staged changes. Nothing to commit.");
            return Ok(());
        }
        GenerationOutcome::Failed(e) => {
            return Err(e).context("Failed to read the staged diff");
        }
    };

    // Step 4: Commit and push
    if !cli.commit {
        println!("{message}");
        return Ok(());
    }

    let id = commit(&handle, &message).context("Failed to commit")?;
    println!(
        "Committed {id} at {}: {}",
        id.committed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        message.trim()
    );

    if cli.push {
        push(&handle).context("Commit created, but pushing to origin failed")?;
        println!("Pushed to origin.");
    }

    Ok(())
}

/// Log to stderr, `RUST_LOG` first, then `warn` (or `debug` with `--verbose`).
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn print_entries(entries: &[ChangeEntry], max_listed: usize) {
    println!("Changed files:");
    for entry in entries.iter().take(max_listed) {
        println!("  {entry}");
    }
    if entries.len() > max_listed {
        eprintln!(
            "Warning: showing {} of {} changed files.",
            max_listed,
            entries.len()
        );
    }
}

fn select_entries(entries: &[ChangeEntry]) -> Result<Vec<ChangeEntry>> {
    let labels: Vec<String> = entries.iter().map(ToString::to_string).collect();
    let defaults = vec![true; entries.len()];

    let chosen = MultiSelect::new()
        .with_prompt("Select files to commit (space to toggle, enter to confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()
        .context("File selection cancelled")?;

    Ok(chosen.into_iter().map(|i| entries[i].clone()).collect())
}

fn edit_message(message: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt("Commit message")
        .with_initial_text(message)
        .interact_text()
        .context("Message editing cancelled")
}

fn ask_manual_entry(non_interactive: bool) -> Result<RetryState> {
    if non_interactive {
        return Ok(resolve_manual_choice(false));
    }

    let enter_manually = Confirm::new()
        .with_prompt("Enter the commit message manually?")
        .default(true)
        .interact()
        .context("Prompt cancelled")?;

    Ok(resolve_manual_choice(enter_manually))
}

fn read_manual_message() -> Result<String> {
    Input::<String>::new()
        .with_prompt("Commit message")
        .interact_text()
        .context("Message entry cancelled")
}

fn show_diff(handle: &RepositoryHandle, config: &PipelineConfig) -> Result<()> {
    let payload = prepare_payload(handle, config).context("Failed to read the staged diff")?;

    if payload.is_empty() {
        println!("No staged changes.");
        return Ok(());
    }

    println!("{}", payload.text);
    println!("--- Diff statistics ---");
    println!("Characters: {}", payload.text.chars().count());
    println!("Bytes:      {}", payload.size_bytes);
    println!("Limit:      {} characters", config.max_diff_chars);
    println!("Truncated:  {}", if payload.truncated { "yes" } else { "no" });
    Ok(())
}
