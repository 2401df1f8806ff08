use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;

/// Provider-assigned changeset identifier, unique within a project.
pub type ChangeId = u64;

/// Normalized commit record, the unit persisted by the durable cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: ChangeId,
    pub author: String,
    pub email: String,
    pub added_rows: u64,
    pub deleted_rows: u64,
    pub date: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Resolver output for one changeset, before normalization into a [`Commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub project: String,
    pub id: ChangeId,
    pub author: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub added_rows: u64,
    pub deleted_rows: u64,
}

impl From<ChangeSet> for Commit {
    fn from(cs: ChangeSet) -> Self {
        Self {
            id: cs.id,
            author: cs.author,
            email: cs.email,
            added_rows: cs.added_rows,
            deleted_rows: cs.deleted_rows,
            date: cs.date,
            message: cs.message,
            hash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub version: String,
    /// Set for entries without line content of their own: directories and
    /// submodule links.
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMetadata {
    pub author: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub changes: Vec<ChangedPath>,
}

/// Running totals for one statistics bucket. Every field only grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub commits: u64,
    pub added_rows: u64,
    pub deleted_rows: u64,
}

impl Totals {
    pub fn add_commit(&mut self, commit: &Commit) {
        self.commits += 1;
        self.added_rows += commit.added_rows;
        self.deleted_rows += commit.deleted_rows;
    }
}

/// Per-author totals within one project, keyed by author display name.
pub type ByProject = BTreeMap<String, Totals>;

/// Per-project totals of one author, keyed by project name.
pub type ByAuthor = BTreeMap<String, Totals>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReport {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub project: String,
    pub authors: ByProject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorReport {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub author: String,
    pub projects: ByAuthor,
}
