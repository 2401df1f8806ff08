use crate::diff::{diff_text, split_lines, LineCounts};
use crate::error::Result;
use crate::model::{ChangeId, ChangeSet, ChangedPath};
use crate::provider::ChangeProvider;
use std::path::Path;
use tracing::debug;

/// Extensions treated as non-text assets and never diffed.
pub const DEFAULT_SKIP_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Turns one changeset into added/deleted totals by diffing every changed path
/// against its previous version.
pub struct ChangeResolver<'a> {
    provider: &'a dyn ChangeProvider,
    skip_extensions: Vec<String>,
}

impl<'a> ChangeResolver<'a> {
    pub fn new(provider: &'a dyn ChangeProvider) -> Self {
        Self {
            provider,
            skip_extensions: DEFAULT_SKIP_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_skip_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn is_skipped(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.skip_extensions.iter().any(|s| s.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Resolves changeset `id`. Any fetch failure aborts the whole changeset.
    pub fn resolve(&self, project: &str, id: ChangeId) -> Result<ChangeSet> {
        let meta = self.provider.change_metadata(project, id)?;

        let mut totals = LineCounts::default();
        for change in &meta.changes {
            if change.is_directory {
                continue;
            }
            if self.is_skipped(&change.path) {
                debug!(project, id, path = %change.path, "skipping non-text path");
                continue;
            }
            totals += self.changed_rows(project, change)?;
        }

        Ok(ChangeSet {
            project: project.to_string(),
            id,
            author: meta.author,
            email: meta.email,
            date: meta.date,
            message: meta.message,
            added_rows: totals.added,
            deleted_rows: totals.deleted,
        })
    }

    /// A path absent at the change's version was removed there: every previous
    /// line counts as deleted and nothing as added.
    fn changed_rows(&self, project: &str, change: &ChangedPath) -> Result<LineCounts> {
        let current = self
            .provider
            .path_content(project, &change.path, &change.version)?;
        let previous = self
            .provider
            .previous_path_content(project, &change.path, &change.version)?;

        let counts = match (current, previous) {
            (Some(current), None) => {
                LineCounts::new(split_lines(&String::from_utf8_lossy(&current)).len() as u64, 0)
            }
            (Some(current), Some(previous)) => diff_text(
                &String::from_utf8_lossy(&previous),
                &String::from_utf8_lossy(&current),
            ),
            (None, Some(previous)) => {
                LineCounts::new(0, split_lines(&String::from_utf8_lossy(&previous)).len() as u64)
            }
            (None, None) => LineCounts::default(),
        };
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::model::ChangeMetadata;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Fixture {
        changes: Vec<ChangedPath>,
        current: HashMap<String, Option<String>>,
        previous: HashMap<String, String>,
    }

    impl Fixture {
        fn file(mut self, path: &str, previous: Option<&str>, current: &str) -> Self {
            self.changes.push(ChangedPath {
                path: path.to_string(),
                version: "2".to_string(),
                is_directory: false,
            });
            self.current.insert(path.to_string(), Some(current.to_string()));
            if let Some(p) = previous {
                self.previous.insert(path.to_string(), p.to_string());
            }
            self
        }

        fn removed(mut self, path: &str, previous: &str) -> Self {
            self.changes.push(ChangedPath {
                path: path.to_string(),
                version: "2".to_string(),
                is_directory: false,
            });
            self.current.insert(path.to_string(), None);
            self.previous.insert(path.to_string(), previous.to_string());
            self
        }

        fn dir(mut self, path: &str) -> Self {
            self.changes.push(ChangedPath {
                path: path.to_string(),
                version: "2".to_string(),
                is_directory: true,
            });
            self
        }
    }

    impl ChangeProvider for Fixture {
        fn list_projects(&self) -> Result<Vec<String>> {
            Ok(vec!["project".into()])
        }

        fn list_change_ids(&self, _project: &str) -> Result<Vec<ChangeId>> {
            Ok(vec![1])
        }

        fn change_metadata(&self, _project: &str, _id: ChangeId) -> Result<ChangeMetadata> {
            Ok(ChangeMetadata {
                author: "Ivan".into(),
                email: "ivan@example.com".into(),
                date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                message: "change".into(),
                changes: self.changes.clone(),
            })
        }

        fn path_content(
            &self,
            _project: &str,
            path: &str,
            _version: &str,
        ) -> Result<Option<Vec<u8>>> {
            self.current
                .get(path)
                .map(|c| c.clone().map(String::into_bytes))
                .ok_or_else(|| MetricsError::ProviderUnavailable(format!("no content for {path}")))
        }

        fn previous_path_content(
            &self,
            _project: &str,
            path: &str,
            _version: &str,
        ) -> Result<Option<Vec<u8>>> {
            Ok(self.previous.get(path).map(|c| c.clone().into_bytes()))
        }
    }

    #[test]
    fn first_version_counts_every_line_as_added() {
        let provider = Fixture::default().file("src/new.rs", None, "a\nb\nc");
        let cs = ChangeResolver::new(&provider).resolve("project", 1).unwrap();
        assert_eq!((cs.added_rows, cs.deleted_rows), (3, 0));
        assert_eq!(cs.author, "Ivan");
        assert_eq!(cs.project, "project");
    }

    #[test]
    fn sums_diffs_over_paths() {
        let provider = Fixture::default()
            .file("a.txt", Some("a\nb\nc"), "a\nx\nc")
            .file("b.txt", Some("one\ntwo"), "one");
        let cs = ChangeResolver::new(&provider).resolve("project", 1).unwrap();
        assert_eq!((cs.added_rows, cs.deleted_rows), (1, 2));
    }

    #[test]
    fn removed_path_counts_only_deletions() {
        let provider = Fixture::default()
            .removed("old.txt", "one\ntwo\nthree")
            .removed("empty.txt", "");
        let cs = ChangeResolver::new(&provider).resolve("project", 1).unwrap();
        assert_eq!((cs.added_rows, cs.deleted_rows), (0, 4));
    }

    #[test]
    fn emptied_file_is_diffed_against_its_previous_content() {
        let provider = Fixture::default().file("a.txt", Some("one\ntwo"), "");
        let cs = ChangeResolver::new(&provider).resolve("project", 1).unwrap();
        assert_eq!((cs.added_rows, cs.deleted_rows), (1, 2));
    }

    #[test]
    fn skips_directories_and_images_without_fetching() {
        let mut provider = Fixture::default()
            .dir("src")
            .file("notes.txt", Some("x"), "x\ny");
        for image in ["logo.PNG", "photo.jpg", "scan.jpeg"] {
            provider.changes.push(ChangedPath {
                path: image.to_string(),
                version: "2".to_string(),
                is_directory: false,
            });
        }
        let cs = ChangeResolver::new(&provider).resolve("project", 1).unwrap();
        assert_eq!((cs.added_rows, cs.deleted_rows), (1, 0));
    }

    #[test]
    fn configurable_skip_list() {
        let provider = Fixture::default();
        let resolver = ChangeResolver::new(&provider).with_skip_extensions([".svg", "GIF"]);
        assert!(resolver.is_skipped("icons/app.svg"));
        assert!(resolver.is_skipped("anim.gif"));
        assert!(!resolver.is_skipped("photo.jpg"));
        assert!(!resolver.is_skipped("Makefile"));
    }

    #[test]
    fn fetch_failure_aborts_the_changeset() {
        let mut provider = Fixture::default().file("ok.txt", None, "fine");
        provider.changes.push(ChangedPath {
            path: "missing.txt".to_string(),
            version: "2".to_string(),
            is_directory: false,
        });
        let err = ChangeResolver::new(&provider).resolve("project", 1).unwrap_err();
        assert!(matches!(err, MetricsError::ProviderUnavailable(_)));
    }
}
