//! Git operations using git2-rs.

pub mod changes;
pub mod diff;
pub mod repository;
pub mod stage;

pub use changes::{ChangeEntry, ChangeStatus, Partition, classify_changes, list_changes};
pub use diff::staged_diff;
pub use repository::RepositoryHandle;
pub use stage::{stage_entries, stage_selection, unstage_all};
