use crate::error::{MetricsError, Result};
use crate::model::{ChangeId, Commit, SCHEMA_VERSION};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Persistent commit records, partitioned by project.
///
/// Writes are once-per-key: storing a record under an identifier that already
/// has one keeps the first record.
pub trait CommitStore: Send + Sync {
    fn ensure_partition(&self, project: &str) -> Result<()>;

    fn lookup(&self, id: ChangeId, project: &str) -> Result<Option<Commit>>;

    /// Returns `true` when the record was stored, `false` when one already existed.
    fn put(&self, commit: &Commit, project: &str) -> Result<bool>;
}

pub struct Cache {
    conn: Mutex<Connection>,
}

/// Cache keys are the big-endian bytes of the identifier.
fn key(id: ChangeId) -> [u8; 8] {
    id.to_be_bytes()
}

impl Cache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            MetricsError::CacheUnavailable(format!("{}: {e}", path.display()))
        })?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize()?;
        Ok(cache)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS partitions (
                name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS commits (
                project TEXT NOT NULL,
                id BLOB NOT NULL,
                record TEXT NOT NULL,
                PRIMARY KEY (project, id),
                FOREIGN KEY (project) REFERENCES partitions(name)
            );
            ",
        )?;
        Self::check_schema_version(&conn)
    }

    fn check_schema_version(conn: &Connection) -> Result<()> {
        let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {SCHEMA_VERSION};");
            conn.execute_batch(&set_stmt)?;
        } else if user_version != SCHEMA_VERSION as i64 {
            return Err(MetricsError::CacheUnavailable(format!(
                "Schema version mismatch: expected {}, found {}",
                SCHEMA_VERSION, user_version
            )));
        }

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MetricsError::CacheUnavailable("cache connection lock poisoned".into()))
    }

    /// Number of records stored for `project`.
    pub fn count(&self, project: &str) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE project = ?",
            params![project],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Drops every record of `project`, keeping the partition itself.
    pub fn reset(&self, project: &str) -> Result<u64> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM commits WHERE project = ?", params![project])?;
        debug!(project, removed, "cache partition reset");
        Ok(removed as u64)
    }
}

impl CommitStore for Cache {
    fn ensure_partition(&self, project: &str) -> Result<()> {
        let conn = self.conn()?;
        let created = conn
            .execute(
                "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
                params![project],
            )
            .map_err(|e| MetricsError::CacheUnavailable(format!("partition {project}: {e}")))?;
        if created > 0 {
            debug!(project, "created cache partition");
        }
        Ok(())
    }

    fn lookup(&self, id: ChangeId, project: &str) -> Result<Option<Commit>> {
        let conn = self.conn()?;
        let record: Option<String> = conn
            .query_row(
                "SELECT record FROM commits WHERE project = ? AND id = ?",
                params![project, &key(id)[..]],
                |row| row.get(0),
            )
            .optional()?;
        match record {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&self, commit: &Commit, project: &str) -> Result<bool> {
        let record = serde_json::to_string(commit)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
            params![project],
        )?;
        let stored = tx.execute(
            "INSERT OR IGNORE INTO commits (project, id, record) VALUES (?, ?, ?)",
            params![project, &key(commit.id)[..], record],
        )?;
        tx.commit()?;
        Ok(stored > 0)
    }
}
