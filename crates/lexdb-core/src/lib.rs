//! Core types and traits for the lexdb model layer.
//!
//! This crate provides the foundational abstractions the model layer sits on:
//!
//! - `Value` and `Row` for dynamically-typed SQL data
//! - `Database` trait for synchronous database handles
//! - `LoggerRegistry` and `SqlLogger` for statement-level log sinks
//! - `Dataset` for prepared table/query descriptors
//! - `ValidationRule` for declarative row validation
//! - `MockDatabase`, an in-memory handle used until a real one is installed

pub mod database;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod mock;
pub mod row;
pub mod validate;
pub mod value;

pub use database::{Database, DbHandle, handle_id, same_database};
pub use dataset::{Dataset, DatasetKey, TableRef};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, FieldValidationError, QueryError,
    QueryErrorKind, Result, SchemaError, SchemaErrorKind, TypeError, ValidationError,
    ValidationErrorKind,
};
pub use logging::{LoggerRegistry, LoggerSuspension, MemoryLogger, SqlLogger, StatementLog};
pub use mock::MockDatabase;
pub use row::{ColumnInfo, Row};
pub use validate::{ValidationRule, validate_row};
pub use value::Value;
