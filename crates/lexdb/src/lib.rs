//! lexdb - model layer for WordNet-style lexical databases.
//!
//! lexdb provides the registry glue a lexical database front-end needs:
//!
//! - A process-wide [`ModelRegistry`] of model classes sharing one active
//!   database handle, with connection switches propagated to every class
//! - Silent switches: statements executed while a new handle is installed
//!   run with that handle's log sinks suspended, and the sinks come back
//!   unchanged even when the switch fails
//! - A memoizing factory ([`model`]) that turns a data source — a bare
//!   handle or a prepared dataset — into a model class, returning the
//!   identical class for equal sources
//! - Runtime schema declaration and validation rules on each class, plus
//!   ready-made declarations for the standard lexical tables
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lexdb::{Lexicon, registry};
//! use lexdb_sqlite::{SqliteConfig, SqliteDatabase};
//!
//! // The global registry starts on a mock handle; install the real file.
//! let db = SqliteDatabase::handle(&SqliteConfig::file("wordnet31.sqlite"))?;
//! registry().set_database(&db)?;
//!
//! let lexicon = Lexicon::define(registry())?;
//! let rows = lexicon.words().all()?;
//!
//! // Anonymous classes are memoized per source.
//! let words = lexdb::model(lexdb_core::Dataset::table(db.clone(), "words"))?;
//! assert!(std::sync::Arc::ptr_eq(
//!     &words,
//!     &lexdb::model(lexdb_core::Dataset::table(db, "words"))?,
//! ));
//! ```

pub mod factory;
pub mod lexicon;
pub mod model;
pub mod registry;
pub mod schema;

pub use factory::{Source, SourceKey, model};
pub use lexicon::{Lexicon, PART_OF_SPEECH_TAGS};
pub use model::ModelClass;
pub use registry::{ModelRegistry, registry};
pub use schema::{ColumnDef, ColumnType, TableSchema, TableSchemaBuilder};

// Re-export the core surface so downstream crates need only `lexdb`.
pub use lexdb_core::{
    Database, Dataset, DatasetKey, DbHandle, Error, LoggerRegistry, LoggerSuspension,
    MemoryLogger, MockDatabase, Result, Row, SqlLogger, StatementLog, TableRef, ValidationError,
    ValidationRule, Value, handle_id, same_database,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use lexdb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Database, Dataset, DbHandle, Error, Lexicon, MemoryLogger, MockDatabase, ModelClass,
        ModelRegistry, Result, Row, Source, SqlLogger, TableSchema, ValidationRule, Value, model,
        registry,
    };
}
