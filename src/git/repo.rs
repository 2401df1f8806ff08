use crate::error::{MetricsError, Result};
use crate::model::{ChangeMetadata, ChangedPath};
use chrono::DateTime;
use gix::object::tree::diff::ChangeDetached;
use gix::object::tree::EntryMode;
use gix::{discover, ObjectId, Repository, ThreadSafeRepository};
use std::path::{Path, PathBuf};

pub struct GitRepo {
    repo: ThreadSafeRepository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = discover(path.as_ref())?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo: repo.into_sync(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name used for the repository when no project name is configured.
    pub fn default_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    fn local(&self) -> Repository {
        self.repo.to_thread_local()
    }

    /// Commits along the first-parent chain of HEAD, oldest first.
    pub fn first_parent_chain(&self) -> Result<Vec<ObjectId>> {
        let repo = self.local();
        let mut head = repo.head()?;
        if head.is_unborn() {
            return Ok(Vec::new());
        }

        let mut chain = Vec::new();
        let mut next = Some(head.peel_to_commit_in_place()?.id);
        while let Some(id) = next {
            chain.push(id);
            let commit = repo.find_commit(id)?;
            next = commit.parent_ids().next().map(|pid| pid.detach());
        }
        chain.reverse();
        Ok(chain)
    }

    /// Author, date, title and the paths touched relative to the first parent.
    /// Every path's version is the commit id itself.
    pub fn change_metadata(&self, commit_id: ObjectId) -> Result<ChangeMetadata> {
        let repo = self.local();
        let commit = repo.find_commit(commit_id)?;
        let secs = commit.time()?.seconds;
        let date = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| MetricsError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

        let author = commit.author()?;
        let (author_name, author_email) = (author.name.to_string(), author.email.to_string());
        let message = commit.message()?.title.to_string();

        let tree = commit.tree()?;
        let parent_tree = match commit.parent_ids().next() {
            Some(pid) => Some(repo.find_commit(pid.detach())?.tree()?),
            None => None,
        };
        let changes: Vec<ChangeDetached> =
            repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let version = commit_id.to_string();
        let mut paths = Vec::with_capacity(changes.len());
        for change in changes {
            match change {
                ChangeDetached::Addition {
                    location,
                    entry_mode,
                    ..
                }
                | ChangeDetached::Deletion {
                    location,
                    entry_mode,
                    ..
                }
                | ChangeDetached::Modification {
                    location,
                    entry_mode,
                    ..
                } => paths.push(ChangedPath {
                    path: location.to_string(),
                    version: version.clone(),
                    is_directory: !has_content(entry_mode),
                }),
                ChangeDetached::Rewrite {
                    source_location,
                    location,
                    entry_mode,
                    ..
                } => {
                    // a rename is the removal of the source plus the addition of the target
                    for path in [source_location, location] {
                        paths.push(ChangedPath {
                            path: path.to_string(),
                            version: version.clone(),
                            is_directory: !has_content(entry_mode),
                        });
                    }
                }
            }
        }

        Ok(ChangeMetadata {
            author: author_name,
            email: author_email,
            date,
            message,
            changes: paths,
        })
    }

    /// Blob content of `path` in commit `version`, `None` if absent there.
    pub fn blob_at(&self, version: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let repo = self.local();
        let tree = repo.find_commit(parse_commit_id(version)?)?.tree()?;
        blob_in_tree(&repo, &tree, path)
    }

    /// Blob content of `path` in the first parent of `version`, `None` when the
    /// commit is a root or the path did not exist in the parent.
    pub fn blob_before(&self, version: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let repo = self.local();
        let commit = repo.find_commit(parse_commit_id(version)?)?;
        let Some(parent_id) = commit.parent_ids().next().map(|pid| pid.detach()) else {
            return Ok(None);
        };
        let tree = repo.find_commit(parent_id)?.tree()?;
        blob_in_tree(&repo, &tree, path)
    }
}

/// Trees and submodule commits (gitlinks) carry no lines of their own. A
/// gitlink names a commit of another repository, not an object here.
fn has_content(mode: EntryMode) -> bool {
    !(mode.is_tree() || mode.is_commit())
}

fn parse_commit_id(version: &str) -> Result<ObjectId> {
    ObjectId::from_hex(version.as_bytes())
        .map_err(|e| MetricsError::GitRepo(format!("Invalid commit ID '{version}': {e}")))
}

fn blob_in_tree(repo: &Repository, tree: &gix::Tree<'_>, path: &str) -> Result<Option<Vec<u8>>> {
    let entry = tree
        .lookup_entry_by_path(path)
        .map_err(|e| MetricsError::GitRepo(format!("Failed to look up '{path}': {e}")))?;
    match entry {
        Some(entry) if has_content(entry.mode()) => {
            Ok(Some(repo.find_object(entry.object_id())?.detach().data))
        }
        _ => Ok(None),
    }
}
