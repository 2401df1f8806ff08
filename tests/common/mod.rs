#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use linemetrics::cache::CommitStore;
use linemetrics::model::{ChangeId, ChangeMetadata, ChangedPath, Commit};
use linemetrics::provider::ChangeProvider;
use linemetrics::{MetricsError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One changed file: its path, content before (if any) and after.
pub struct FileChange {
    pub path: &'static str,
    pub before: Option<&'static str>,
    pub after: &'static str,
}

/// In-memory provider that counts every call made to it.
#[derive(Default)]
pub struct StubProvider {
    projects: BTreeMap<String, Vec<(ChangeId, String, Vec<FileChange>)>>,
    failing: HashSet<(String, ChangeId)>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change(
        mut self,
        project: &str,
        id: ChangeId,
        author: &str,
        files: Vec<FileChange>,
    ) -> Self {
        self.projects
            .entry(project.to_string())
            .or_default()
            .push((id, author.to_string(), files));
        self
    }

    /// Metadata for `id` fails as if the provider were down.
    pub fn failing(mut self, project: &str, id: ChangeId) -> Self {
        self.failing.insert((project.to_string(), id));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn file(&self, project: &str, path: &str, version: &str) -> Result<&FileChange> {
        let id: ChangeId = version
            .parse()
            .map_err(|_| MetricsError::ProviderUnavailable(format!("bad version {version}")))?;
        self.projects
            .get(project)
            .and_then(|changes| changes.iter().find(|(cid, _, _)| *cid == id))
            .and_then(|(_, _, files)| files.iter().find(|f| f.path == path))
            .ok_or_else(|| MetricsError::ProviderUnavailable(format!("no {path}@{version}")))
    }
}

impl ChangeProvider for StubProvider {
    fn list_projects(&self) -> Result<Vec<String>> {
        self.hit();
        Ok(self.projects.keys().cloned().collect())
    }

    fn list_change_ids(&self, project: &str) -> Result<Vec<ChangeId>> {
        self.hit();
        self.projects
            .get(project)
            .map(|changes| changes.iter().map(|(id, _, _)| *id).collect())
            .ok_or_else(|| MetricsError::UnknownProject(project.to_string()))
    }

    fn change_metadata(&self, project: &str, id: ChangeId) -> Result<ChangeMetadata> {
        self.hit();
        if self.failing.contains(&(project.to_string(), id)) {
            return Err(MetricsError::ProviderUnavailable("connection reset".into()));
        }
        let (_, author, files) = self
            .projects
            .get(project)
            .and_then(|changes| changes.iter().find(|(cid, _, _)| *cid == id))
            .ok_or_else(|| MetricsError::UnknownChange {
                project: project.to_string(),
                id,
            })?;
        Ok(ChangeMetadata {
            author: author.clone(),
            email: format!("{}@example.com", author.to_lowercase()),
            date: Utc.with_ymd_and_hms(2022, 2, 2, 10, 0, 0).unwrap(),
            message: format!("change {id}"),
            changes: files
                .iter()
                .map(|f| ChangedPath {
                    path: f.path.to_string(),
                    version: id.to_string(),
                    is_directory: false,
                })
                .collect(),
        })
    }

    fn path_content(&self, project: &str, path: &str, version: &str) -> Result<Option<Vec<u8>>> {
        self.hit();
        Ok(Some(self.file(project, path, version)?.after.as_bytes().to_vec()))
    }

    fn previous_path_content(
        &self,
        project: &str,
        path: &str,
        version: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.hit();
        Ok(self
            .file(project, path, version)?
            .before
            .map(|b| b.as_bytes().to_vec()))
    }
}

/// Store whose operations fail on demand. Counts attempted writes.
#[derive(Default)]
pub struct BrokenStore {
    pub fail_partition: bool,
    pub fail_lookup: bool,
    pub fail_put: bool,
    pub puts: AtomicUsize,
}

impl BrokenStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl CommitStore for BrokenStore {
    fn ensure_partition(&self, project: &str) -> Result<()> {
        if self.fail_partition {
            return Err(MetricsError::CacheUnavailable(format!(
                "cannot create partition {project}"
            )));
        }
        Ok(())
    }

    fn lookup(&self, _id: ChangeId, _project: &str) -> Result<Option<Commit>> {
        if self.fail_lookup {
            return Err(MetricsError::CacheUnavailable("database is locked".into()));
        }
        Ok(None)
    }

    fn put(&self, _commit: &Commit, _project: &str) -> Result<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(MetricsError::CacheUnavailable("disk full".into()));
        }
        Ok(true)
    }
}

pub fn file(path: &'static str, before: Option<&'static str>, after: &'static str) -> FileChange {
    FileChange {
        path,
        before,
        after,
    }
}

pub fn has_git() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok()
}

pub fn git(dir: &std::path::Path, args: &[&str]) {
    assert!(std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

pub fn init_git_repo(dir: &std::path::Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "user.email", "ivan@example.com"]);
    git(dir, &["config", "user.name", "Ivan"]);
}

/// Writes `content` to `name` and commits it as `author`.
pub fn commit_file(dir: &std::path::Path, author: &str, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    git(dir, &["add", "."]);
    git(
        dir,
        &[
            "-c",
            &format!("user.name={author}"),
            "-c",
            &format!("user.email={}@example.com", author.to_lowercase()),
            "commit",
            "-q",
            "-m",
            &format!("update {name}"),
        ],
    );
}

pub fn remove_file(dir: &std::path::Path, name: &str) {
    git(dir, &["rm", "-q", name]);
    git(dir, &["commit", "-q", "-m", &format!("remove {name}")]);
}
