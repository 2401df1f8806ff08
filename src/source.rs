//! Sources of [`Commit`] records by identifier.
//!
//! [`RemoteSource`] always resolves through the provider. [`CachedSource`] wraps
//! another source with the durable cache: hits are returned as stored, misses
//! are resolved by the inner source and written back.

use crate::cache::CommitStore;
use crate::error::{MetricsError, Result};
use crate::model::{ChangeId, Commit};
use crate::resolve::ChangeResolver;
use tracing::{debug, warn};

pub trait CommitSource {
    /// Called once before the first fetch for `project`.
    fn prepare(&self, project: &str) -> Result<()>;

    fn fetch(&self, project: &str, id: ChangeId) -> Result<Commit>;
}

pub struct RemoteSource<'a> {
    resolver: ChangeResolver<'a>,
}

impl<'a> RemoteSource<'a> {
    pub fn new(resolver: ChangeResolver<'a>) -> Self {
        Self { resolver }
    }
}

impl CommitSource for RemoteSource<'_> {
    fn prepare(&self, _project: &str) -> Result<()> {
        Ok(())
    }

    fn fetch(&self, project: &str, id: ChangeId) -> Result<Commit> {
        self.resolver.resolve(project, id).map(Commit::from)
    }
}

pub struct CachedSource<'a, S> {
    store: &'a dyn CommitStore,
    inner: S,
}

impl<'a, S: CommitSource> CachedSource<'a, S> {
    pub fn new(store: &'a dyn CommitStore, inner: S) -> Self {
        Self { store, inner }
    }
}

impl<S: CommitSource> CommitSource for CachedSource<'_, S> {
    fn prepare(&self, project: &str) -> Result<()> {
        self.store.ensure_partition(project)?;
        self.inner.prepare(project)
    }

    /// A failed write still hands the resolved commit back, inside
    /// [`MetricsError::CachePutFailed`].
    fn fetch(&self, project: &str, id: ChangeId) -> Result<Commit> {
        match self.store.lookup(id, project) {
            Ok(Some(commit)) => {
                debug!(project, id, "cache hit");
                return Ok(commit);
            }
            Ok(None) => debug!(project, id, "cache miss"),
            Err(e) => warn!(project, id, error = %e, "cache lookup failed, resolving remotely"),
        }

        let commit = self.inner.fetch(project, id)?;
        match self.store.put(&commit, project) {
            Ok(_) => Ok(commit),
            Err(e) => Err(MetricsError::CachePutFailed {
                commit: Box::new(commit),
                source: Box::new(e),
            }),
        }
    }
}
