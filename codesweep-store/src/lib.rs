//! CodeSweep Store - Session and Diagnostic Persistence
//!
//! A thin SQLite layer recording one row per analysis invocation plus the
//! diagnostics it produced, for later filter-by-column queries. Opened
//! once per run; writes happen sequentially from the main control thread
//! after aggregation. Failure to open the database is fatal (it is the
//! only fatal condition in the persistence path); everything afterwards
//! surfaces as a logged error on the caller's side.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use chrono::{DateTime, Utc};
use codesweep_core::models::{AnalysisError, AnalysisSession, Category, Severity};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("database mutex poisoned")]
    Poisoned,
}

/// SQLite-backed store for analysis sessions and their diagnostics.
pub struct ErrorDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl ErrorDatabase {
    /// Open (creating if necessary) the database at `path` and run
    /// migrations. Parent directories are created as needed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        debug!("opened error database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests and `--db`-less runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS analysis_sessions (
                id TEXT PRIMARY KEY,
                target_path TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                tools_used TEXT NOT NULL,
                total_errors INTEGER NOT NULL DEFAULT 0,
                config_hash TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS errors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES analysis_sessions(id),
                file_path TEXT NOT NULL,
                line INTEGER NOT NULL,
                \"column\" INTEGER NOT NULL,
                error_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                tool_source TEXT NOT NULL,
                category TEXT NOT NULL,
                fix_suggestion TEXT,
                confidence REAL NOT NULL,
                context TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_errors_session ON errors(session_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_errors_category ON errors(category)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_errors_severity ON errors(severity)",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Record a new session at the start of a run.
    pub fn create_session(&self, session: &AnalysisSession) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO analysis_sessions
                (id, target_path, timestamp, tools_used, total_errors, config_hash, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.target_path,
                session.timestamp.to_rfc3339(),
                session.tools_used.join(","),
                session.total_errors as i64,
                session.config_hash,
                i64::from(session.completed),
            ],
        )?;
        Ok(())
    }

    /// Update a session exactly once at the end of a run.
    pub fn finalize_session(&self, session_id: &str, total_errors: usize) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE analysis_sessions SET total_errors = ?1, completed = 1 WHERE id = ?2",
            params![total_errors as i64, session_id],
        )?;
        Ok(())
    }

    /// Insert every diagnostic of a run in a single transaction.
    pub fn insert_errors(&self, session_id: &str, errors: &[AnalysisError]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO errors
                    (session_id, file_path, line, \"column\", error_type, severity,
                     message, tool_source, category, fix_suggestion, confidence, context)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)",
            )?;
            for error in errors {
                statement.execute(params![
                    session_id,
                    error.file_path,
                    error.line as i64,
                    error.column as i64,
                    error.error_type,
                    error.severity.as_str(),
                    error.message,
                    error.tool_source,
                    error.category.as_str(),
                    error.fix_suggestion,
                    error.confidence(),
                ])?;
            }
        }
        tx.commit()?;
        debug!("stored {} error(s) for session {session_id}", errors.len());
        Ok(())
    }

    pub fn session(&self, session_id: &str) -> StoreResult<Option<AnalysisSession>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(
            "SELECT id, target_path, timestamp, tools_used, total_errors, config_hash, completed
             FROM analysis_sessions WHERE id = ?1",
        )?;
        let mut rows = statement.query(params![session_id])?;
        match rows.next()? {
            Some(row) => {
                let timestamp: String = row.get(2)?;
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| StoreError::CorruptRow(format!("timestamp: {e}")))?
                    .with_timezone(&Utc);
                let tools: String = row.get(3)?;
                let total_errors: i64 = row.get(4)?;
                let completed: i64 = row.get(6)?;
                Ok(Some(AnalysisSession {
                    id: row.get(0)?,
                    target_path: row.get(1)?,
                    timestamp,
                    tools_used: if tools.is_empty() {
                        Vec::new()
                    } else {
                        tools.split(',').map(ToString::to_string).collect()
                    },
                    total_errors: usize::try_from(total_errors).unwrap_or(0),
                    config_hash: row.get(5)?,
                    completed: completed != 0,
                }))
            }
            None => Ok(None),
        }
    }

    /// All diagnostics for one session.
    pub fn session_errors(&self, session_id: &str) -> StoreResult<Vec<AnalysisError>> {
        self.query_errors(
            "SELECT file_path, line, \"column\", error_type, severity, message,
                    tool_source, category, fix_suggestion, confidence
             FROM errors WHERE session_id = ?1 ORDER BY id",
            params![session_id],
        )
    }

    pub fn errors_by_category(
        &self,
        session_id: &str,
        category: Category,
    ) -> StoreResult<Vec<AnalysisError>> {
        self.query_errors(
            "SELECT file_path, line, \"column\", error_type, severity, message,
                    tool_source, category, fix_suggestion, confidence
             FROM errors WHERE session_id = ?1 AND category = ?2 ORDER BY id",
            params![session_id, category.as_str()],
        )
    }

    pub fn errors_by_severity(
        &self,
        session_id: &str,
        severity: Severity,
    ) -> StoreResult<Vec<AnalysisError>> {
        self.query_errors(
            "SELECT file_path, line, \"column\", error_type, severity, message,
                    tool_source, category, fix_suggestion, confidence
             FROM errors WHERE session_id = ?1 AND severity = ?2 ORDER BY id",
            params![session_id, severity.as_str()],
        )
    }

    fn query_errors(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<AnalysisError>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(sql)?;
        let mut rows = statement.query(params)?;
        let mut errors = Vec::new();
        while let Some(row) = rows.next()? {
            errors.push(Self::row_to_error(row)?);
        }
        Ok(errors)
    }

    fn row_to_error(row: &rusqlite::Row<'_>) -> StoreResult<AnalysisError> {
        let severity: String = row.get(4)?;
        let severity: Severity = severity
            .parse()
            .map_err(|e: String| StoreError::CorruptRow(e))?;
        let category: String = row.get(7)?;
        let category: Category = category
            .parse()
            .map_err(|e: String| StoreError::CorruptRow(e))?;
        let file_path: String = row.get(0)?;
        let line: i64 = row.get(1)?;
        let column: i64 = row.get(2)?;
        let error_type: String = row.get(3)?;
        let message: String = row.get(5)?;
        let tool_source: String = row.get(6)?;
        let fix_suggestion: Option<String> = row.get(8)?;
        let confidence: f64 = row.get(9)?;

        let mut error = AnalysisError::new(
            file_path,
            usize::try_from(line).unwrap_or(0),
            usize::try_from(column).unwrap_or(0),
            error_type,
            severity,
            message,
            tool_source,
            category,
        )
        .with_confidence(confidence);
        if let Some(suggestion) = fix_suggestion {
            error = error.with_suggestion(suggestion);
        }
        Ok(error)
    }
}
