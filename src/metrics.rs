//! Monotonic counters labeled by project, author and email.
//!
//! Counters only ever grow. Increments are safe from any number of threads, so
//! one sink can be shared by aggregators folding different projects in parallel.

use crate::model::Commit;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub project: String,
    pub author: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesValues {
    pub commits: u64,
    pub added_rows: u64,
    pub deleted_rows: u64,
}

#[derive(Debug, Default)]
struct Series {
    commits: AtomicU64,
    added_rows: AtomicU64,
    deleted_rows: AtomicU64,
}

impl Series {
    fn values(&self) -> SeriesValues {
        SeriesValues {
            commits: self.commits.load(Ordering::Relaxed),
            added_rows: self.added_rows.load(Ordering::Relaxed),
            deleted_rows: self.deleted_rows.load(Ordering::Relaxed),
        }
    }
}

struct Family {
    name: &'static str,
    help: &'static str,
    value: fn(&SeriesValues) -> u64,
}

const FAMILIES: [Family; 3] = [
    Family {
        name: "commits",
        help: "Commits by project and author.",
        value: |v| v.commits,
    },
    Family {
        name: "added_rows",
        help: "Lines added by project and author.",
        value: |v| v.added_rows,
    },
    Family {
        name: "deleted_rows",
        help: "Lines deleted by project and author.",
        value: |v| v.deleted_rows,
    },
];

#[derive(Debug, Default)]
pub struct CounterSink {
    series: DashMap<SeriesKey, Series>,
}

impl CounterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, project: &str, commit: &Commit) {
        let key = SeriesKey {
            project: project.to_string(),
            author: commit.author.clone(),
            email: commit.email.clone(),
        };
        let series = self.series.entry(key).or_default();
        series.commits.fetch_add(1, Ordering::Relaxed);
        series.added_rows.fetch_add(commit.added_rows, Ordering::Relaxed);
        series.deleted_rows.fetch_add(commit.deleted_rows, Ordering::Relaxed);
    }

    pub fn get(&self, project: &str, author: &str, email: &str) -> Option<SeriesValues> {
        let key = SeriesKey {
            project: project.to_string(),
            author: author.to_string(),
            email: email.to_string(),
        };
        self.series.get(&key).map(|s| s.values())
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Current values of every series, ordered by labels.
    pub fn snapshot(&self) -> Vec<(SeriesKey, SeriesValues)> {
        let mut rows: Vec<_> = self
            .series
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().values()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Prometheus text exposition of all counters.
    pub fn render(&self) -> String {
        let rows = self.snapshot();
        let mut out = String::new();
        for family in &FAMILIES {
            out.push_str(&format!("# HELP {} {}\n", family.name, family.help));
            out.push_str(&format!("# TYPE {} counter\n", family.name));
            for (key, values) in &rows {
                out.push_str(&format!(
                    "{}{{project=\"{}\",author=\"{}\",email=\"{}\"}} {}\n",
                    family.name,
                    escape_label(&key.project),
                    escape_label(&key.author),
                    escape_label(&key.email),
                    (family.value)(values)
                ));
            }
        }
        out
    }
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn commit(author: &str, added: u64, deleted: u64) -> Commit {
        Commit {
            id: 1,
            author: author.to_string(),
            email: format!("{}@example.com", author.to_lowercase()),
            added_rows: added,
            deleted_rows: deleted,
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            message: String::new(),
            hash: None,
        }
    }

    #[test]
    fn render_lists_each_family() {
        let sink = CounterSink::new();
        sink.record("web", &commit("Ivan", 5, 10));
        sink.record("web", &commit("Ivan", 1, 0));

        let expected = "\
# HELP commits Commits by project and author.
# TYPE commits counter
commits{project=\"web\",author=\"Ivan\",email=\"ivan@example.com\"} 2
# HELP added_rows Lines added by project and author.
# TYPE added_rows counter
added_rows{project=\"web\",author=\"Ivan\",email=\"ivan@example.com\"} 6
# HELP deleted_rows Lines deleted by project and author.
# TYPE deleted_rows counter
deleted_rows{project=\"web\",author=\"Ivan\",email=\"ivan@example.com\"} 10
";
        assert_eq!(sink.render(), expected);
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let sink = CounterSink::new();
        std::thread::scope(|s| {
            for project in ["alpha", "beta"] {
                for _ in 0..4 {
                    let sink = &sink;
                    s.spawn(move || {
                        for _ in 0..250 {
                            sink.record(project, &commit("Pety", 2, 1));
                        }
                    });
                }
            }
        });
        for project in ["alpha", "beta"] {
            assert_eq!(
                sink.get(project, "Pety", "pety@example.com"),
                Some(SeriesValues {
                    commits: 1000,
                    added_rows: 2000,
                    deleted_rows: 1000
                })
            );
        }
        assert_eq!(sink.snapshot().len(), 2);
    }
}
