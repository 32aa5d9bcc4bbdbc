//! The anonymous model-class factory.
//!
//! `model_for` turns a data source — a bare database handle or a prepared
//! dataset — into a model class, memoized per source for the life of the
//! process: equal sources return the identical `Arc`. A handle and a dataset
//! that happen to target the same table are distinct sources and get
//! distinct classes.

use crate::model::ModelClass;
use crate::registry::{ModelRegistry, registry};
use lexdb_core::{Dataset, DatasetKey, DbHandle, Result, handle_id};
use std::sync::Arc;

/// A data source for the anonymous-class factory.
#[derive(Clone)]
pub enum Source {
    /// A bare database handle; the class binds directly to the connection.
    Database(DbHandle),
    /// A prepared dataset; the class binds to the descriptor itself.
    Dataset(Dataset),
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Database(db) => f.debug_tuple("Database").field(&db.label()).finish(),
            Source::Dataset(dataset) => f.debug_tuple("Dataset").field(dataset).finish(),
        }
    }
}

impl Source {
    /// The memoization key for this source.
    pub fn key(&self) -> SourceKey {
        match self {
            Source::Database(db) => SourceKey::Database(handle_id(db)),
            Source::Dataset(dataset) => SourceKey::Dataset(dataset.key()),
        }
    }

    fn class_name(&self) -> String {
        match self {
            Source::Database(db) => format!("anonymous({})", db.label()),
            Source::Dataset(dataset) => format!("anonymous({})", dataset.table_ref()),
        }
    }
}

impl From<DbHandle> for Source {
    fn from(db: DbHandle) -> Self {
        Source::Database(db)
    }
}

impl From<&DbHandle> for Source {
    fn from(db: &DbHandle) -> Self {
        Source::Database(db.clone())
    }
}

impl From<Dataset> for Source {
    fn from(dataset: Dataset) -> Self {
        Source::Dataset(dataset)
    }
}

impl From<&Dataset> for Source {
    fn from(dataset: &Dataset) -> Self {
        Source::Dataset(dataset.clone())
    }
}

/// Memoization key: connection identity, or connection identity plus the
/// dataset's table/query form. The two variants never collide, so a handle
/// and a dataset over the same table stay separate cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// A bare handle, by `Arc` identity
    Database(usize),
    /// A dataset, by handle identity and form
    Dataset(DatasetKey),
}

impl ModelRegistry {
    /// Return the model class for a source, constructing it on first use.
    ///
    /// Construction binds the class under log suppression — a bare handle is
    /// probed silently; a dataset is adopted as-is — and registers the class
    /// so later connection switches reach it. The cache never evicts:
    /// repeated calls with an equal source return the identical class.
    pub fn model_for(&self, source: impl Into<Source>) -> Result<Arc<ModelClass>> {
        let source = source.into();
        let key = source.key();

        let mut cache = self.anonymous_cache().lock().unwrap();
        if let Some(class) = cache.get(&key) {
            return Ok(Arc::clone(class));
        }

        let class = Arc::new(ModelClass::new(source.class_name(), None));
        match &source {
            Source::Database(db) => {
                db.loggers().suspended(|| class.bind_database(db))?;
            }
            Source::Dataset(dataset) => {
                dataset.database().loggers().suspended(|| {
                    class.bind_dataset(dataset.clone());
                });
            }
        }

        tracing::debug!(model = %class.name(), "constructed anonymous model class");
        self.register(Arc::clone(&class));
        cache.insert(key, Arc::clone(&class));
        Ok(class)
    }
}

/// Look a source up in the process-global registry.
///
/// Convenience wrapper over [`ModelRegistry::model_for`] on [`registry`].
pub fn model(source: impl Into<Source>) -> Result<Arc<ModelClass>> {
    registry().model_for(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdb_core::{Database, MemoryLogger, MockDatabase, same_database};

    #[test]
    fn repeated_lookup_returns_the_identical_class() {
        let registry = ModelRegistry::new();
        let conn1 = MockDatabase::handle("conn1");

        let first = registry.model_for(conn1.clone()).unwrap();
        let second = registry.model_for(conn1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_handles_get_distinct_classes() {
        let registry = ModelRegistry::new();
        let conn1 = MockDatabase::handle("conn1");
        let conn2 = MockDatabase::handle("conn2");

        let first = registry.model_for(conn1).unwrap();
        let other = registry.model_for(conn2).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn handle_sources_bind_to_the_connection() {
        let registry = ModelRegistry::new();
        let db = MockDatabase::handle("conn");
        let class = registry.model_for(db.clone()).unwrap();

        assert!(same_database(&class.database().unwrap(), &db));
        assert!(class.dataset().is_none());
    }

    #[test]
    fn dataset_sources_bind_to_the_descriptor() {
        let registry = ModelRegistry::new();
        let db = MockDatabase::handle("conn");
        let dataset = Dataset::table(db.clone(), "words");

        let class = registry.model_for(dataset.clone()).unwrap();
        assert_eq!(class.dataset().unwrap(), dataset);

        // equal dataset value, same class
        let again = registry.model_for(Dataset::table(db, "words")).unwrap();
        assert!(Arc::ptr_eq(&class, &again));
    }

    #[test]
    fn handle_and_dataset_over_the_same_table_stay_distinct() {
        let registry = ModelRegistry::new();
        let db = MockDatabase::handle("conn");

        let by_handle = registry.model_for(db.clone()).unwrap();
        let by_dataset = registry
            .model_for(Dataset::table(db, "words"))
            .unwrap();
        assert!(!Arc::ptr_eq(&by_handle, &by_dataset));
    }

    #[test]
    fn construction_probe_is_silent() {
        let registry = ModelRegistry::new();
        let mock = Arc::new(MockDatabase::new("conn"));
        let sink = MemoryLogger::new();
        mock.loggers().add(sink.clone());
        let db: DbHandle = mock.clone();

        registry.model_for(db.clone()).unwrap();
        assert_eq!(mock.executed(), vec!["SELECT 1"]);
        assert!(sink.is_empty());
        assert_eq!(db.loggers().len(), 1);
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let registry = ModelRegistry::new();
        let mock = Arc::new(MockDatabase::new("flaky"));
        mock.fail_on("SELECT 1");
        let db: DbHandle = mock.clone();

        assert!(registry.model_for(db.clone()).is_err());
        assert!(registry.classes().is_empty());

        mock.clear_failure();
        let class = registry.model_for(db).unwrap();
        assert_eq!(registry.classes().len(), 1);
        assert!(class.database().is_some());
    }

    #[test]
    fn anonymous_classes_follow_connection_switches() {
        let registry = ModelRegistry::new();
        let conn1 = MockDatabase::handle("conn1");
        let class = registry.model_for(conn1).unwrap();

        let conn2 = MockDatabase::handle("conn2");
        registry.set_database(&conn2).unwrap();
        assert!(same_database(&class.database().unwrap(), &conn2));
    }

    #[test]
    fn dataset_keys_hash_by_form_and_handle() {
        let db = MockDatabase::handle("conn");
        let words = Source::from(Dataset::table(db.clone(), "words"));
        let senses = Source::from(Dataset::table(db.clone(), "senses"));
        let bare = Source::from(db);

        assert_eq!(words.key(), words.key());
        assert_ne!(words.key(), senses.key());
        assert_ne!(words.key(), bare.key());
    }
}
