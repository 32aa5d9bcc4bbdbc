//! Database handle trait.
//!
//! [`Database`] is the seam to the underlying relational store: a synchronous,
//! object-safe surface for executing statements and fetching rows, plus access
//! to the handle's statement [`LoggerRegistry`]. Handles are shared as
//! [`DbHandle`] (`Arc<dyn Database>`); two handles are "the same connection"
//! exactly when their `Arc`s point at the same allocation.

use crate::error::Result;
use crate::logging::LoggerRegistry;
use crate::row::Row;
use crate::value::Value;
use std::sync::Arc;

/// A synchronous database handle.
///
/// Implementations must record every executed statement to their
/// [`LoggerRegistry`]; suspension of that registry is what makes connection
/// switches and anonymous-class binds silent.
pub trait Database: Send + Sync {
    /// Execute a statement (DDL, INSERT, UPDATE, DELETE) and return rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// The rowid of the most recent successful INSERT on this handle.
    fn last_insert_rowid(&self) -> i64;

    /// Check the handle is usable by running a trivial statement.
    ///
    /// The probe goes through the normal statement path, so it is recorded
    /// to the log sinks unless they are suspended.
    fn ping(&self) -> Result<()> {
        self.query_one("SELECT 1", &[]).map(|_| ())
    }

    /// A human-readable label for this handle (path, URL, or mock name).
    fn label(&self) -> &str;

    /// The statement log sinks attached to this handle.
    fn loggers(&self) -> &LoggerRegistry;
}

/// A shared database handle.
pub type DbHandle = Arc<dyn Database>;

/// Identity of a handle: the address of the `Arc` allocation.
///
/// This is the "same connection" notion used for memoization keys — two
/// clones of one `Arc` share an identity; two separately opened handles to
/// the same file do not.
#[must_use]
pub fn handle_id(db: &DbHandle) -> usize {
    Arc::as_ptr(db).cast::<()>() as usize
}

/// Check whether two handles are the same connection.
#[must_use]
pub fn same_database(a: &DbHandle, b: &DbHandle) -> bool {
    handle_id(a) == handle_id(b)
}
