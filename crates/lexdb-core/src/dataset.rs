//! Prepared table/query descriptors.
//!
//! A [`Dataset`] pairs a database handle with either a table reference or a
//! raw SQL form. Model classes built from a dataset are bound to that
//! specific descriptor — not to its connection generically — so the
//! descriptor, together with its handle's identity, is a memoization key.

use crate::database::{DbHandle, handle_id};
use crate::error::{Error, Result, TypeError};
use crate::row::Row;
use std::fmt;

/// What a dataset selects from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRef {
    /// A named table
    Table(String),
    /// A raw SQL query
    Sql(String),
}

impl TableRef {
    /// The table name, for table-backed datasets.
    pub fn name(&self) -> Option<&str> {
        match self {
            TableRef::Table(name) => Some(name),
            TableRef::Sql(_) => None,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Table(name) => write!(f, "{name}"),
            TableRef::Sql(sql) => write!(f, "({sql})"),
        }
    }
}

/// A prepared table/query descriptor against a specific handle.
#[derive(Clone)]
pub struct Dataset {
    db: DbHandle,
    from: TableRef,
}

impl Dataset {
    /// A dataset over a named table.
    pub fn table(db: DbHandle, name: impl Into<String>) -> Self {
        Self {
            db,
            from: TableRef::Table(name.into()),
        }
    }

    /// A dataset over a raw SQL query.
    pub fn from_sql(db: DbHandle, sql: impl Into<String>) -> Self {
        Self {
            db,
            from: TableRef::Sql(sql.into()),
        }
    }

    /// The handle this dataset runs against.
    pub fn database(&self) -> &DbHandle {
        &self.db
    }

    /// The table/query form.
    pub fn table_ref(&self) -> &TableRef {
        &self.from
    }

    /// The same descriptor re-targeted at another handle.
    ///
    /// Used when the active connection is switched out from under a bound
    /// model class.
    pub fn with_database(&self, db: DbHandle) -> Self {
        Self {
            db,
            from: self.from.clone(),
        }
    }

    /// The SELECT statement this dataset renders.
    pub fn select_sql(&self) -> String {
        match &self.from {
            TableRef::Table(name) => format!("SELECT * FROM {name}"),
            TableRef::Sql(sql) => sql.clone(),
        }
    }

    /// The COUNT statement this dataset renders.
    pub fn count_sql(&self) -> String {
        match &self.from {
            TableRef::Table(name) => format!("SELECT COUNT(*) FROM {name}"),
            TableRef::Sql(sql) => format!("SELECT COUNT(*) FROM ({sql})"),
        }
    }

    /// Fetch every row.
    pub fn all(&self) -> Result<Vec<Row>> {
        self.db.query(&self.select_sql(), &[])
    }

    /// Fetch the first row, if any.
    pub fn first(&self) -> Result<Option<Row>> {
        self.db.query_one(&self.select_sql(), &[])
    }

    /// Count the rows.
    pub fn count(&self) -> Result<u64> {
        let row = self.db.query_one(&self.count_sql(), &[])?;
        let count = row
            .as_ref()
            .and_then(|r| r.get(0))
            .and_then(crate::value::Value::as_i64)
            .ok_or_else(|| {
                Error::Type(TypeError {
                    expected: "INTEGER",
                    actual: "absent".to_string(),
                    column: None,
                })
            })?;
        Ok(count.max(0) as u64)
    }

    /// The memoization key for this descriptor.
    pub fn key(&self) -> DatasetKey {
        DatasetKey {
            database: handle_id(&self.db),
            from: self.from.clone(),
        }
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("database", &self.db.label())
            .field("from", &self.from)
            .finish()
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Dataset {}

/// Equality semantics for dataset memoization.
///
/// Two datasets are the same source when they run against the identical
/// handle (same `Arc` allocation) and have equal table/query forms. A handle
/// used directly as a source never equals a dataset over that handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    /// Identity of the handle (see [`handle_id`])
    pub database: usize,
    /// The table/query form
    pub from: TableRef,
}
