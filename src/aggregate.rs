use crate::error::{MetricsError, Result};
use crate::metrics::CounterSink;
use crate::model::{ByAuthor, ByProject, Commit};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Folds commit sequences into per-author and per-project totals and into the
/// shared counter sink.
///
/// On error, everything folded before the failure stays in place.
pub struct Aggregator {
    author: Option<String>,
    by_project: BTreeMap<String, ByProject>,
    by_author: ByAuthor,
    counters: Arc<CounterSink>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_counters(Arc::new(CounterSink::new()))
    }

    /// An aggregator feeding an existing sink, e.g. one shared across threads.
    pub fn with_counters(counters: Arc<CounterSink>) -> Self {
        Self {
            author: None,
            by_project: BTreeMap::new(),
            by_author: ByAuthor::new(),
            counters,
        }
    }

    /// Only commits by exactly this author display name feed [`Self::by_author`].
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Pulls `commits` until exhaustion and returns how many were folded.
    ///
    /// A commit whose cache write failed is still folded. Any other error stops
    /// the pull and is returned.
    pub fn consume<I>(&mut self, project: &str, commits: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Commit>>,
    {
        let mut folded = 0;
        for item in commits {
            let commit = match item {
                Ok(commit) => commit,
                Err(MetricsError::CachePutFailed { commit, source }) => {
                    warn!(project, id = commit.id, error = %source, "commit not cached");
                    *commit
                }
                Err(e) => return Err(e),
            };
            self.fold(project, &commit);
            folded += 1;
        }
        Ok(folded)
    }

    pub fn fold(&mut self, project: &str, commit: &Commit) {
        self.by_project
            .entry(project.to_string())
            .or_default()
            .entry(commit.author.clone())
            .or_default()
            .add_commit(commit);

        if self.author.as_deref() == Some(commit.author.as_str()) {
            self.by_author
                .entry(project.to_string())
                .or_default()
                .add_commit(commit);
        }

        self.counters.record(project, commit);
    }

    /// Per-author totals of `project`.
    pub fn project(&self, project: &str) -> Option<&ByProject> {
        self.by_project.get(project)
    }

    pub fn by_project(&self) -> &BTreeMap<String, ByProject> {
        &self.by_project
    }

    /// Per-project totals of the filtered author, across every project consumed.
    pub fn by_author(&self) -> &ByAuthor {
        &self.by_author
    }

    pub fn counters(&self) -> &Arc<CounterSink> {
        &self.counters
    }
}
