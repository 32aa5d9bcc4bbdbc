//! In-memory mock database.
//!
//! The model registry starts against a mock handle until a real database is
//! installed, and the unit tests run against one throughout. The mock records
//! every executed statement, serves canned rows keyed by SQL text, and can be
//! primed to fail matching statements (for error-path tests).

use crate::database::{Database, DbHandle};
use crate::error::{Error, QueryError, QueryErrorKind, Result};
use crate::logging::{LoggerRegistry, StatementLog};
use crate::row::Row;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// An in-memory [`Database`] that records statements instead of running them.
#[derive(Debug, Default)]
pub struct MockDatabase {
    label: String,
    loggers: LoggerRegistry,
    executed: Mutex<Vec<String>>,
    canned: Mutex<HashMap<String, Vec<Row>>>,
    fail_on: Mutex<Option<String>>,
    rowid: AtomicI64,
}

impl MockDatabase {
    /// Create a mock with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Create a mock already wrapped as a shared handle.
    pub fn handle(label: impl Into<String>) -> DbHandle {
        Arc::new(Self::new(label))
    }

    /// Serve the given rows for an exact SQL text.
    pub fn prime(&self, sql: impl Into<String>, rows: Vec<Row>) {
        self.canned.lock().unwrap().insert(sql.into(), rows);
    }

    /// Fail any statement whose SQL contains the given fragment.
    pub fn fail_on(&self, fragment: impl Into<String>) {
        *self.fail_on.lock().unwrap() = Some(fragment.into());
    }

    /// Stop failing statements.
    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// The SQL texts executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Forget the execution history.
    pub fn clear_executed(&self) {
        self.executed.lock().unwrap().clear();
    }

    fn run(&self, sql: &str, rows_affected: Option<u64>, started: Instant) -> Result<()> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.loggers
            .record(&StatementLog::new(sql, rows_affected, started.elapsed()));

        let primed = self.fail_on.lock().unwrap().clone();
        if let Some(fragment) = primed {
            if sql.contains(&fragment) {
                return Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Database,
                    sql: Some(sql.to_string()),
                    message: format!("primed failure on '{fragment}'"),
                    source: None,
                }));
            }
        }
        Ok(())
    }
}

impl Database for MockDatabase {
    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.run(sql, Some(0), Instant::now())?;
        if sql.trim_start().to_ascii_uppercase().starts_with("INSERT") {
            self.rowid.fetch_add(1, Ordering::SeqCst);
        }
        Ok(0)
    }

    fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, None, Instant::now())?;
        Ok(self
            .canned
            .lock()
            .unwrap()
            .get(sql)
            .cloned()
            .unwrap_or_default())
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn last_insert_rowid(&self) -> i64 {
        self.rowid.load(Ordering::SeqCst)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn loggers(&self) -> &LoggerRegistry {
        &self.loggers
    }
}
