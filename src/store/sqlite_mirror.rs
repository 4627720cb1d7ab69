//! SQLite mirror of the event log, indexed for log queries.
//!
//! The mirror is a convenience for filtered reads; the JSONL log stays
//! authoritative. The schema is versioned and migrated once when the mirror is
//! opened.

use super::log_entry::LogEntry;
use crate::error::{ObservatoryError, Result};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Ordered schema migrations; each runs once, inside a transaction.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    r"
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        agent_name TEXT NOT NULL,
        level TEXT NOT NULL DEFAULT 'INFO',
        message TEXT NOT NULL,
        extra_data TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
    CREATE INDEX IF NOT EXISTS idx_logs_agent_name ON logs(agent_name);
    CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);
    ",
)];

/// Row counts over the mirrored log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_logs: u64,
    pub logs_by_level: BTreeMap<String, u64>,
    pub logs_by_agent: BTreeMap<String, u64>,
    /// Rows inserted during the last hour, by `created_at`.
    pub recent_activity: u64,
    /// Distinct agents with at least one row.
    pub active_agents: usize,
}

/// Indexed SQLite copy of the event log, one [`LogEntry`] per row.
pub struct SqliteMirror {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteMirror {
    /// Open or create the database at `db_path` and bring its schema up to date.
    ///
    /// Missing parent directories are created.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// An in-memory mirror, discarded on drop.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Location of the database file, `:memory:` for in-memory mirrors.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Highest applied migration.
    pub fn schema_version(&self) -> Result<i64> {
        Self::current_version(&self.conn.lock())
    }

    fn current_version(conn: &Connection) -> Result<i64> {
        let version: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(version.unwrap_or(0))
    }

    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);",
        )?;

        let current = Self::current_version(conn)?;
        for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql).map_err(|e| {
                ObservatoryError::Storage(format!("Migration {} failed: {}", version, e))
            })?;
            tx.execute("INSERT INTO schema_version (version) VALUES (?1)", params![version])?;
            tx.commit()?;
            info!(version, "Applied log mirror migration");
        }

        Ok(())
    }

    /// Insert a row, returning its id.
    pub fn insert(&self, entry: &LogEntry) -> Result<i64> {
        let extra_data = serde_json::to_string(&entry.extra_data)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO logs (timestamp, agent_name, level, message, extra_data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &entry.timestamp,
                &entry.agent_name,
                &entry.level,
                &entry.message,
                &extra_data
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, agent = %entry.agent_name, "Mirrored log row");
        Ok(id)
    }

    /// Rows most-recent-first, optionally filtered by agent and level.
    pub fn get_logs(
        &self,
        limit: usize,
        agent_filter: Option<&str>,
        level_filter: Option<&str>,
    ) -> Result<Vec<LogEntry>> {
        let mut query = String::from(
            "SELECT id, timestamp, agent_name, level, message, extra_data, created_at
             FROM logs WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(agent) = agent_filter {
            args.push(agent.to_string());
            query.push_str(&format!(" AND agent_name = ?{}", args.len()));
        }
        if let Some(level) = level_filter {
            args.push(level.to_uppercase());
            query.push_str(&format!(" AND level = ?{}", args.len()));
        }
        args.push(limit.to_string());
        query.push_str(&format!(
            " ORDER BY timestamp DESC, id DESC LIMIT CAST(?{} AS INTEGER)",
            args.len()
        ));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            let extra: Option<String> = row.get(5)?;
            Ok(LogEntry {
                id: Some(row.get(0)?),
                timestamp: row.get(1)?,
                agent_name: row.get(2)?,
                level: row.get(3)?,
                message: row.get(4)?,
                extra_data: extra
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_else(|| Value::Object(Default::default())),
                created_at: row.get(6)?,
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Distinct agent names, sorted.
    pub fn agents(&self) -> Result<Vec<String>> {
        self.distinct("agent_name")
    }

    /// Distinct levels, sorted.
    pub fn levels(&self) -> Result<Vec<String>> {
        self.distinct("level")
    }

    /// Totals by level and agent, plus activity over the last hour.
    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.conn.lock();

        let total_logs: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        let logs_by_level = Self::grouped_counts(&conn, "level")?;
        let logs_by_agent = Self::grouped_counts(&conn, "agent_name")?;
        let recent_activity: i64 = conn.query_row(
            "SELECT COUNT(*) FROM logs WHERE datetime(created_at) > datetime('now', '-1 hour')",
            [],
            |row| row.get(0),
        )?;

        Ok(LogStats {
            total_logs: total_logs.max(0) as u64,
            active_agents: logs_by_agent.len(),
            logs_by_level,
            logs_by_agent,
            recent_activity: recent_activity.max(0) as u64,
        })
    }

    fn grouped_counts(conn: &Connection, column: &'static str) -> Result<BTreeMap<String, u64>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {column}, COUNT(*) FROM logs GROUP BY {column}"
        ))?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((key, count.max(0) as u64))
        })?;
        Ok(rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()?)
    }

    fn distinct(&self, column: &'static str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {column} FROM logs ORDER BY {column}"
        ))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }
}
