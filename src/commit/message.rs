//! Conventional commit types, the single-line message format and its grammar.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Conventional commit types understood by the pipeline.
///
/// The first ten are the core set; `Rename` and `Remove` form the extended
/// set used when file moves and deletions get their own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
    Ci,
    Build,
    Rename,
    Remove,
}

impl CommitType {
    /// All twelve types, in prompt order.
    pub const ALL: [CommitType; 12] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Ci,
        CommitType::Build,
        CommitType::Rename,
        CommitType::Remove,
    ];

    /// The types allowed for the given configuration.
    pub fn allowed(extended: bool) -> &'static [CommitType] {
        static TYPES: [CommitType; 12] = CommitType::ALL;
        if extended { &TYPES } else { &TYPES[..10] }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Ci => "ci",
            CommitType::Build => "build",
            CommitType::Rename => "rename",
            CommitType::Remove => "remove",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown commit type: {}", s))
    }
}

/// A validated `<type>: <description>` commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub commit_type: CommitType,
    pub description: String,
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.commit_type, self.description)
    }
}

// `.` never matches a line break and `$` only matches at the very end, so a
// multi-line candidate is rejected.
static EXTENDED_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| build_grammar(CommitType::allowed(true)));
static CORE_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| build_grammar(CommitType::allowed(false)));

fn build_grammar(types: &[CommitType]) -> Regex {
    let alternatives: Vec<&str> = types.iter().map(CommitType::as_str).collect();
    let pattern = format!(r"^({}): (.+)$", alternatives.join("|"));
    Regex::new(&pattern).expect("commit grammar pattern is valid")
}

/// Checks candidates against the commit message grammar.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    grammar: &'static Regex,
}

impl Validator {
    /// `extended` adds `rename` and `remove` to the accepted types.
    pub fn new(extended: bool) -> Self {
        let grammar = if extended {
            &*EXTENDED_GRAMMAR
        } else {
            &*CORE_GRAMMAR
        };
        Self { grammar }
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.parse(candidate).is_some()
    }

    /// Parse a candidate, or `None` if it does not match the grammar.
    ///
    /// A description made only of whitespace is rejected even though
    /// `^(type): .+$` alone would accept it.
    pub fn parse(&self, candidate: &str) -> Option<CommitMessage> {
        let caps = self.grammar.captures(candidate)?;
        let commit_type = caps.get(1)?.as_str().parse().ok()?;
        let description = caps.get(2)?.as_str();

        if description.trim().is_empty() {
            return None;
        }

        Some(CommitMessage {
            commit_type,
            description: description.to_string(),
        })
    }
}

/// Whether `candidate` is a valid single-line message with one of the twelve
/// types.
///
/// Stricter than the bare `^(type): .+$` pattern: `"fix:   "` matches that
/// pattern but is invalid here, since its description is only whitespace.
pub fn is_valid(candidate: &str) -> bool {
    Validator::new(true).is_valid(candidate)
}
