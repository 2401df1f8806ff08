//! Local git repositories as a [`ChangeProvider`].
//!
//! Each configured repository is one project. Change identifiers are 1-based
//! positions along the first-parent chain of HEAD, oldest first, and stay
//! stable as long as that history is not rewritten.

mod repo;

pub use repo::GitRepo;

use crate::error::{MetricsError, Result};
use crate::model::{ChangeId, ChangeMetadata};
use crate::provider::ChangeProvider;
use dashmap::DashMap;
use gix::ObjectId;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct GitProvider {
    repos: BTreeMap<String, GitRepo>,
    chains: DashMap<String, Arc<Vec<ObjectId>>>,
}

impl GitProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every `(name, path)` pair as a project.
    pub fn open<I, N, P>(projects: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: AsRef<Path>,
    {
        let mut provider = Self::new();
        for (name, path) in projects {
            provider.add(name, GitRepo::open(path)?);
        }
        Ok(provider)
    }

    pub fn add(&mut self, name: impl Into<String>, repo: GitRepo) {
        let name = name.into();
        self.chains.remove(&name);
        self.repos.insert(name, repo);
    }

    fn repo(&self, project: &str) -> Result<&GitRepo> {
        self.repos
            .get(project)
            .ok_or_else(|| MetricsError::UnknownProject(project.to_string()))
    }

    fn refresh_chain(&self, project: &str) -> Result<Arc<Vec<ObjectId>>> {
        let chain = Arc::new(self.repo(project)?.first_parent_chain()?);
        debug!(project, commits = chain.len(), "walked first-parent history");
        self.chains.insert(project.to_string(), Arc::clone(&chain));
        Ok(chain)
    }

    fn chain(&self, project: &str) -> Result<Arc<Vec<ObjectId>>> {
        if let Some(chain) = self.chains.get(project) {
            return Ok(Arc::clone(chain.value()));
        }
        self.refresh_chain(project)
    }
}

impl ChangeProvider for GitProvider {
    fn list_projects(&self) -> Result<Vec<String>> {
        Ok(self.repos.keys().cloned().collect())
    }

    fn list_change_ids(&self, project: &str) -> Result<Vec<ChangeId>> {
        let chain = self.refresh_chain(project)?;
        Ok((1..=chain.len() as ChangeId).collect())
    }

    fn change_metadata(&self, project: &str, id: ChangeId) -> Result<ChangeMetadata> {
        let chain = self.chain(project)?;
        let commit_id = id
            .checked_sub(1)
            .and_then(|idx| chain.get(idx as usize))
            .ok_or_else(|| MetricsError::UnknownChange {
                project: project.to_string(),
                id,
            })?;
        self.repo(project)?.change_metadata(*commit_id)
    }

    fn path_content(&self, project: &str, path: &str, version: &str) -> Result<Option<Vec<u8>>> {
        self.repo(project)?.blob_at(version, path)
    }

    fn previous_path_content(
        &self,
        project: &str,
        path: &str,
        version: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.repo(project)?.blob_before(version, path)
    }
}
