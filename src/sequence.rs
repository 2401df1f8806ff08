use crate::cache::CommitStore;
use crate::error::Result;
use crate::model::{ChangeId, Commit};
use crate::provider::ChangeProvider;
use crate::resolve::ChangeResolver;
use crate::source::{CachedSource, CommitSource, RemoteSource};
use std::iter::FusedIterator;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Opened,
    Streaming,
    Exhausted,
}

/// The commits of one project, not yet opened.
pub struct CommitCollection<'a> {
    project: String,
    provider: &'a dyn ChangeProvider,
    store: Option<&'a dyn CommitStore>,
    skip_extensions: Option<Vec<String>>,
}

impl<'a> CommitCollection<'a> {
    /// `store` is the durable cache; `None` disables caching.
    pub fn new(
        project: impl Into<String>,
        provider: &'a dyn ChangeProvider,
        store: Option<&'a dyn CommitStore>,
    ) -> Self {
        Self {
            project: project.into(),
            provider,
            store,
            skip_extensions: None,
        }
    }

    pub fn with_skip_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Prepares the cache partition, then fetches the full identifier list.
    /// Content is only resolved as the returned sequence is pulled.
    pub fn open(self) -> Result<CommitSequence<'a>> {
        let mut resolver = ChangeResolver::new(self.provider);
        if let Some(extensions) = &self.skip_extensions {
            resolver = resolver.with_skip_extensions(extensions);
        }
        let remote = RemoteSource::new(resolver);
        let source: Box<dyn CommitSource + 'a> = match self.store {
            Some(store) => Box::new(CachedSource::new(store, remote)),
            None => Box::new(remote),
        };
        source.prepare(&self.project)?;

        let ids = self.provider.list_change_ids(&self.project)?;
        info!(project = %self.project, changes = ids.len(), cached = self.store.is_some(), "opened commit sequence");

        Ok(CommitSequence {
            project: self.project,
            ids,
            cursor: 0,
            source,
            state: SequenceState::Opened,
        })
    }
}

/// Forward-only, lazily resolved commits of one project.
///
/// Each pull advances the cursor by one, even when resolution fails. Once the
/// identifiers run out every further pull yields `None`.
pub struct CommitSequence<'a> {
    project: String,
    ids: Vec<ChangeId>,
    cursor: usize,
    source: Box<dyn CommitSource + 'a>,
    state: SequenceState,
}

impl CommitSequence<'_> {
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn remaining(&self) -> usize {
        self.ids.len() - self.cursor
    }
}

impl Iterator for CommitSequence<'_> {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(&id) = self.ids.get(self.cursor) else {
            self.state = SequenceState::Exhausted;
            return None;
        };
        self.cursor += 1;
        self.state = SequenceState::Streaming;
        Some(self.source.fetch(&self.project, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for CommitSequence<'_> {}

impl FusedIterator for CommitSequence<'_> {}
