//! SQLite implementation of the `Database` trait.

// Allow casts where we need to match C types exactly.
#![allow(clippy::cast_possible_truncation)]

use crate::types;
use lexdb_core::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use lexdb_core::row::ColumnInfo;
use lexdb_core::{Database, Error, LoggerRegistry, Result, Row, StatementLog, Value};
use libsqlite3_sys as ffi;
use serde::{Deserialize, Serialize};
use std::ffi::{CStr, c_int};
use std::ptr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Configuration for opening SQLite handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in serialized mode (handle shareable across threads).
    pub full_mutex: bool,
}

impl OpenFlags {
    /// Flags for read-only access, the usual mode for shipped lexicons.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Inner state, protected by a mutex for thread safety.
struct SqliteInner {
    db: *mut ffi::sqlite3,
}

// SAFETY: SQLite handles can be sent between threads when access is
// serialized; all access goes through the Mutex.
unsafe impl Send for SqliteInner {}

impl Drop for SqliteInner {
    fn drop(&mut self) {
        // SAFETY: db was opened by us and is closed exactly once.
        unsafe {
            ffi::sqlite3_close(self.db);
        }
    }
}

/// A SQLite database handle.
pub struct SqliteDatabase {
    inner: Mutex<SqliteInner>,
    path: String,
    loggers: LoggerRegistry,
}

impl SqliteDatabase {
    /// Open a handle with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = types::sql_cstring(&config.path).ok_or_else(|| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: we pass valid pointers and check the return value.
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let message = if db.is_null() {
                format!("failed to open database (code {rc})")
            } else {
                // SAFETY: db is valid; errmsg returns a valid C string.
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            };
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("failed to open {}: {message}", config.path),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid.
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        Ok(Self {
            inner: Mutex::new(SqliteInner { db }),
            path: config.path.clone(),
            loggers: LoggerRegistry::new(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open (or create) a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Open a handle already wrapped as a shared `DbHandle`.
    pub fn handle(config: &SqliteConfig) -> Result<lexdb_core::DbHandle> {
        Ok(Arc::new(Self::open(config)?))
    }

    /// Run one statement, optionally collecting result rows.
    ///
    /// Statements are prepared, bound, stepped to completion, and recorded to
    /// the log sinks whether they succeed or fail.
    fn run_statement(&self, sql: &str, params: &[Value], collect: bool) -> Result<(Vec<Row>, u64)> {
        let inner = self.inner.lock().unwrap();
        let started = Instant::now();
        let result = run_on(inner.db, sql, params, collect);

        // Only mutating statements report affected rows; for queries the
        // change counter is leftover from whatever ran before.
        let rows_affected = match &result {
            Ok((_, changed)) if !collect => Some(*changed),
            _ => None,
        };
        self.loggers
            .record(&StatementLog::new(sql, rows_affected, started.elapsed()));
        result
    }
}

fn run_on(
    db: *mut ffi::sqlite3,
    sql: &str,
    params: &[Value],
    collect: bool,
) -> Result<(Vec<Row>, u64)> {
    let c_sql = types::sql_cstring(sql).ok_or_else(|| syntax_error(sql, "contains null byte"))?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    // SAFETY: db and pointers are valid; rc is checked.
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(db, c_sql.as_ptr(), -1, &mut stmt, ptr::null_mut())
    };
    if rc != ffi::SQLITE_OK {
        return Err(db_error(db, sql, rc));
    }
    if stmt.is_null() {
        // Whitespace or comment only; nothing to run.
        return Ok((Vec::new(), 0));
    }
    let stmt = StatementGuard { stmt };

    for (i, value) in params.iter().enumerate() {
        // SAFETY: stmt is valid; parameter indexes are 1-based.
        let rc = unsafe { types::bind_value(stmt.stmt, (i + 1) as c_int, value) };
        if rc != ffi::SQLITE_OK {
            return Err(db_error(db, sql, rc));
        }
    }

    let mut rows = Vec::new();
    let mut columns: Option<Arc<ColumnInfo>> = None;
    loop {
        // SAFETY: stmt is valid.
        let rc = unsafe { ffi::sqlite3_step(stmt.stmt) };
        match rc {
            ffi::SQLITE_ROW => {
                if !collect {
                    continue;
                }
                let columns = columns.get_or_insert_with(|| {
                    // SAFETY: stmt is positioned on a row.
                    Arc::new(ColumnInfo::new(unsafe { types::column_names(stmt.stmt) }))
                });
                let values = (0..columns.len())
                    // SAFETY: stmt is positioned on a row; indexes are in range.
                    .map(|i| unsafe { types::column_value(stmt.stmt, i as c_int) })
                    .collect();
                rows.push(Row::with_columns(columns.clone(), values));
            }
            ffi::SQLITE_DONE => break,
            _ => return Err(db_error(db, sql, rc)),
        }
    }

    // SAFETY: db is valid.
    let changed = unsafe { ffi::sqlite3_changes(db) };
    Ok((rows, changed.max(0) as u64))
}

/// Finalizes the statement on every exit path.
struct StatementGuard {
    stmt: *mut ffi::sqlite3_stmt,
}

impl Drop for StatementGuard {
    fn drop(&mut self) {
        // SAFETY: stmt is valid and finalized exactly once.
        unsafe {
            ffi::sqlite3_finalize(self.stmt);
        }
    }
}

fn db_error(db: *mut ffi::sqlite3, sql: &str, rc: c_int) -> Error {
    // SAFETY: db is valid; errmsg returns a valid C string.
    let message = unsafe {
        CStr::from_ptr(ffi::sqlite3_errmsg(db))
            .to_string_lossy()
            .into_owned()
    };
    let kind = if (rc & 0xff) == ffi::SQLITE_CONSTRAINT {
        QueryErrorKind::Constraint
    } else {
        QueryErrorKind::Database
    };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        message,
        source: None,
    })
}

fn syntax_error(sql: &str, message: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: message.to_string(),
        source: None,
    })
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let (_, changed) = self.run_statement(sql, params, false)?;
        Ok(changed)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let (rows, _) = self.run_statement(sql, params, true)?;
        Ok(rows)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn last_insert_rowid(&self) -> i64 {
        let inner = self.inner.lock().unwrap();
        // SAFETY: db is valid.
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    fn label(&self) -> &str {
        &self.path
    }

    fn loggers(&self) -> &LoggerRegistry {
        &self.loggers
    }
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdb_core::MemoryLogger;

    fn words_db() -> SqliteDatabase {
        let db = SqliteDatabase::open_memory().unwrap();
        db.execute(
            "CREATE TABLE words (wordid INTEGER PRIMARY KEY, lemma TEXT NOT NULL UNIQUE)",
            &[],
        )
        .unwrap();
        db
    }

    #[test]
    fn execute_and_query_round_trip() {
        let db = words_db();
        db.execute(
            "INSERT INTO words (lemma) VALUES (?1)",
            &[Value::Text("run".to_string())],
        )
        .unwrap();
        db.execute(
            "INSERT INTO words (lemma) VALUES (?1)",
            &[Value::Text("walk".to_string())],
        )
        .unwrap();

        let rows = db
            .query("SELECT wordid, lemma FROM words ORDER BY wordid", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("lemma").unwrap(), "run");
        assert_eq!(rows[1].integer("wordid").unwrap(), 2);
    }

    #[test]
    fn query_one_returns_first_row() {
        let db = words_db();
        db.execute("INSERT INTO words (lemma) VALUES ('run')", &[])
            .unwrap();
        let row = db
            .query_one("SELECT lemma FROM words", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row.text("lemma").unwrap(), "run");
        assert!(
            db.query_one("SELECT lemma FROM words WHERE lemma = 'absent'", &[])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn last_insert_rowid_tracks_inserts() {
        let db = words_db();
        db.execute("INSERT INTO words (lemma) VALUES ('run')", &[])
            .unwrap();
        assert_eq!(db.last_insert_rowid(), 1);
        db.execute("INSERT INTO words (lemma) VALUES ('walk')", &[])
            .unwrap();
        assert_eq!(db.last_insert_rowid(), 2);
    }

    #[test]
    fn constraint_violations_are_classified() {
        let db = words_db();
        db.execute("INSERT INTO words (lemma) VALUES ('run')", &[])
            .unwrap();
        let err = db
            .execute("INSERT INTO words (lemma) VALUES ('run')", &[])
            .unwrap_err();
        match err {
            Error::Query(q) => assert_eq!(q.kind, QueryErrorKind::Constraint),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn statements_reach_log_sinks() {
        let db = words_db();
        let sink = MemoryLogger::new();
        db.loggers().add(sink.clone());

        db.execute("INSERT INTO words (lemma) VALUES ('run')", &[])
            .unwrap();
        db.query("SELECT * FROM words", &[]).unwrap();

        let statements = sink.statements();
        assert_eq!(
            statements,
            vec![
                "INSERT INTO words (lemma) VALUES ('run')",
                "SELECT * FROM words"
            ]
        );
        assert_eq!(sink.entries()[0].rows_affected, Some(1));
    }

    #[test]
    fn failed_statements_are_still_recorded() {
        let db = words_db();
        let sink = MemoryLogger::new();
        db.loggers().add(sink.clone());

        assert!(db.query("SELECT * FROM missing_table", &[]).is_err());
        assert_eq!(sink.statements(), vec!["SELECT * FROM missing_table"]);
        assert_eq!(sink.entries()[0].rows_affected, None);
    }

    #[test]
    fn binds_every_value_variant() {
        let db = SqliteDatabase::open_memory().unwrap();
        db.execute(
            "CREATE TABLE t (a INTEGER, b REAL, c TEXT, d BLOB, e INTEGER, f TEXT)",
            &[],
        )
        .unwrap();
        db.execute(
            "INSERT INTO t VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &[
                Value::Int(7),
                Value::Float(2.5),
                Value::Text("text".to_string()),
                Value::Bytes(vec![1, 2, 3]),
                Value::Bool(true),
                Value::Json(serde_json::json!({"pos": "n"})),
            ],
        )
        .unwrap();

        let row = db.query_one("SELECT * FROM t", &[]).unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(7)));
        assert_eq!(row.get(1), Some(&Value::Float(2.5)));
        assert_eq!(row.get(2), Some(&Value::Text("text".to_string())));
        assert_eq!(row.get(3), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(row.get(4), Some(&Value::Int(1)));
        assert_eq!(
            row.get(5),
            Some(&Value::Text("{\"pos\":\"n\"}".to_string()))
        );
    }

    #[test]
    fn null_round_trip() {
        let db = SqliteDatabase::open_memory().unwrap();
        db.execute("CREATE TABLE t (a TEXT)", &[]).unwrap();
        db.execute("INSERT INTO t VALUES (?1)", &[Value::Null])
            .unwrap();
        let row = db.query_one("SELECT a FROM t", &[]).unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Value::Null));
    }

    #[test]
    fn opens_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.sqlite");
        let path = path.to_string_lossy().into_owned();

        {
            let db = SqliteDatabase::open_file(path.clone()).unwrap();
            db.execute("CREATE TABLE words (lemma TEXT)", &[]).unwrap();
            db.execute("INSERT INTO words VALUES ('run')", &[]).unwrap();
        }

        let reopened = SqliteDatabase::open(
            &SqliteConfig::file(path).flags(OpenFlags::read_only()),
        )
        .unwrap();
        let rows = reopened.query("SELECT * FROM words", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(
            reopened
                .execute("INSERT INTO words VALUES ('walk')", &[])
                .is_err()
        );
    }

    #[test]
    fn ping_probes_the_handle() {
        let db = SqliteDatabase::open_memory().unwrap();
        let sink = MemoryLogger::new();
        db.loggers().add(sink.clone());
        db.ping().unwrap();
        assert_eq!(sink.statements(), vec!["SELECT 1"]);
    }
}
