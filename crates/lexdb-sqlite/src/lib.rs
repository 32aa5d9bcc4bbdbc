//! SQLite database handle for the lexdb model layer.
//!
//! Lexical databases ship as SQLite files; this crate implements the
//! [`Database`](lexdb_core::Database) trait over `libsqlite3-sys`, with
//! statement logging wired through the handle's
//! [`LoggerRegistry`](lexdb_core::LoggerRegistry).
//!
//! ```rust,ignore
//! use lexdb_sqlite::{SqliteConfig, SqliteDatabase};
//!
//! let db = SqliteDatabase::open(&SqliteConfig::file("wordnet31.sqlite"))?;
//! let rows = db.query("SELECT lemma FROM words LIMIT 10", &[])?;
//! ```

// Raw sqlite3 handles require unsafe throughout the driver.
#![allow(unsafe_code)]

pub mod connection;
mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteDatabase};
