//! Prompt construction for AI-generated commit messages.

use crate::commit::message::CommitType;
use crate::commit::payload::DiffPayload;

/// Build the prompt for generating a single-line commit message.
///
/// Lists the allowed types, the required `type: description` syntax and three
/// worked examples, then appends the diff verbatim.
pub fn build_commit_prompt(diff: &DiffPayload, types: &[CommitType]) -> String {
    let type_list = types
        .iter()
        .map(CommitType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let examples = worked_examples(types).join("\n");

    let truncation_note = if diff.truncated {
        "Note: The diff was truncated due to size. Focus on the visible changes.\n\n"
    } else {
        ""
    };

    format!(
        "Generate a single-line Git commit message following the Conventional Commit specification based on the provided git diff.\n\n\
         Types: {type_list}.\n\n\
         The commit message should start with the type, followed by a colon and a space, then a short description. \
         Do not add a scope, a body, quotes or any explanation. Reply with the commit message only.\n\n\
         Examples:\n\
         {examples}\n\n\
         {truncation_note}{diff_text}",
        diff_text = diff.text,
    )
}

fn worked_examples(types: &[CommitType]) -> Vec<&'static str> {
    let mut examples = vec!["feat: add user authentication module"];
    if types.contains(&CommitType::Rename) {
        examples.push("rename: move config file to config/settings.json");
    } else {
        examples.push("fix: handle empty input in config parser");
    }
    if types.contains(&CommitType::Remove) {
        examples.push("remove: delete deprecated API endpoints");
    } else {
        examples.push("docs: document the release process");
    }
    examples
}
