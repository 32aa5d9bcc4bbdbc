//! The model registry.
//!
//! A [`ModelRegistry`] owns the single active database handle and the
//! append-only, registration-ordered list of model classes that share it.
//! Installing a new handle propagates it to every registered class;
//! the statements executed during the switch itself run with the incoming
//! handle's log sinks suspended, and the sinks are restored — unchanged and
//! in the same order — even when the switch fails.
//!
//! A process-global registry is reachable through [`registry`]; it starts
//! against an in-memory mock handle until a real database is installed.

use crate::factory::SourceKey;
use crate::model::ModelClass;
use lexdb_core::{DbHandle, MockDatabase, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Registry of model classes sharing one active database handle.
pub struct ModelRegistry {
    db: RwLock<Option<DbHandle>>,
    classes: RwLock<Vec<Arc<ModelClass>>>,
    anonymous: Mutex<HashMap<SourceKey, Arc<ModelClass>>>,
}

impl ModelRegistry {
    /// Create a registry with no active handle.
    pub fn new() -> Self {
        Self {
            db: RwLock::new(None),
            classes: RwLock::new(Vec::new()),
            anonymous: Mutex::new(HashMap::new()),
        }
    }

    /// Create a registry with an active handle already installed.
    pub fn with_database(db: DbHandle) -> Self {
        let registry = Self::new();
        *registry.db.write().unwrap() = Some(db);
        registry
    }

    /// The active handle, if one is installed.
    pub fn database(&self) -> Option<DbHandle> {
        self.db.read().unwrap().clone()
    }

    /// The registered classes, in registration order.
    pub fn classes(&self) -> Vec<Arc<ModelClass>> {
        self.classes.read().unwrap().clone()
    }

    /// Define a named model class over a table.
    ///
    /// The class is bound to the current handle (when one is installed) and
    /// appended to the registry, so later switches reach it.
    pub fn define(&self, name: impl Into<String>, table: impl Into<String>) -> Arc<ModelClass> {
        let class = Arc::new(ModelClass::new(name, Some(table.into())));
        if let Some(db) = self.database() {
            class.attach_database(&db);
        }
        tracing::debug!(model = %class.name(), "registered model class");
        self.register(class.clone());
        class
    }

    /// Install a new active handle and propagate it to every registered class.
    ///
    /// The probe executed during the switch runs with the incoming handle's
    /// log sinks suspended; the sinks are restored before this returns —
    /// including when the probe fails, in which case nothing is installed and
    /// the error propagates unchanged. Each registered class is then rebound
    /// in registration order, with one informational event per class.
    pub fn set_database(&self, newdb: &DbHandle) -> Result<()> {
        newdb.loggers().suspended(|| -> Result<()> {
            newdb.ping()?;
            *self.db.write().unwrap() = Some(newdb.clone());
            Ok(())
        })?;

        for class in self.classes() {
            tracing::info!(
                model = %class.name(),
                database = newdb.label(),
                "resetting database connection"
            );
            class.attach_database(newdb);
        }
        Ok(())
    }

    pub(crate) fn register(&self, class: Arc<ModelClass>) {
        self.classes.write().unwrap().push(class);
    }

    pub(crate) fn anonymous_cache(&self) -> &Mutex<HashMap<SourceKey, Arc<ModelClass>>> {
        &self.anonymous
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field(
                "database",
                &self.database().map(|db| db.label().to_string()),
            )
            .field("classes", &self.classes().len())
            .finish_non_exhaustive()
    }
}

/// Process-global registry storage.
static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();

/// The process-global model registry.
///
/// Initialized on first use against an in-memory mock handle; install a real
/// database with [`ModelRegistry::set_database`] when one is available.
pub fn registry() -> &'static ModelRegistry {
    REGISTRY.get_or_init(|| ModelRegistry::with_database(MockDatabase::handle("mock")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdb_core::{Database, MemoryLogger, same_database};

    #[test]
    fn define_binds_to_the_current_handle() {
        let db = MockDatabase::handle("a");
        let registry = ModelRegistry::with_database(db.clone());

        let words = registry.define("Word", "words");
        assert!(same_database(&words.database().unwrap(), &db));
        assert_eq!(words.dataset().unwrap().select_sql(), "SELECT * FROM words");
        assert_eq!(registry.classes().len(), 1);
    }

    #[test]
    fn define_without_handle_leaves_class_unbound() {
        let registry = ModelRegistry::new();
        let words = registry.define("Word", "words");
        assert!(words.database().is_none());

        let db = MockDatabase::handle("late");
        registry.set_database(&db).unwrap();
        assert!(same_database(&words.database().unwrap(), &db));
    }

    #[test]
    fn switch_reaches_every_class_in_order() {
        let a = MockDatabase::handle("a");
        let registry = ModelRegistry::with_database(a);

        let x = registry.define("Word", "words");
        let y = registry.define("Synset", "synsets");

        let b = MockDatabase::handle("b");
        registry.set_database(&b).unwrap();

        assert!(same_database(&registry.database().unwrap(), &b));
        assert!(same_database(&x.database().unwrap(), &b));
        assert!(same_database(&y.database().unwrap(), &b));

        let names: Vec<_> = registry.classes().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["Word", "Synset"]);
    }

    #[test]
    fn switch_is_silent_on_the_incoming_handle() {
        let mock = Arc::new(MockDatabase::new("b"));
        let sink = MemoryLogger::new();
        mock.loggers().add(sink.clone());
        let b: DbHandle = mock.clone();

        let registry = ModelRegistry::with_database(MockDatabase::handle("a"));
        registry.define("Word", "words");
        registry.set_database(&b).unwrap();

        // the probe ran, but no sink saw it
        assert_eq!(mock.executed(), vec!["SELECT 1"]);
        assert!(sink.is_empty());

        // and the sinks are back afterwards
        assert_eq!(b.loggers().len(), 1);
        b.ping().unwrap();
        assert_eq!(sink.statements(), vec!["SELECT 1"]);
    }

    #[test]
    fn failed_switch_restores_sinks_and_installs_nothing() {
        let mock = Arc::new(MockDatabase::new("bad"));
        mock.fail_on("SELECT 1");
        let first = MemoryLogger::new();
        let second = MemoryLogger::new();
        mock.loggers().add(first.clone());
        mock.loggers().add(second.clone());
        let bad: DbHandle = mock.clone();

        let a = MockDatabase::handle("a");
        let registry = ModelRegistry::with_database(a.clone());
        let words = registry.define("Word", "words");

        assert!(registry.set_database(&bad).is_err());

        // the old handle stays active everywhere
        assert!(same_database(&registry.database().unwrap(), &a));
        assert!(same_database(&words.database().unwrap(), &a));

        // sinks are restored, unchanged and in order
        let restored: Vec<_> = bad
            .loggers()
            .snapshot()
            .iter()
            .map(|s| Arc::as_ptr(s).cast::<()>() as usize)
            .collect();
        let first_dyn: Arc<dyn lexdb_core::SqlLogger> = first;
        let second_dyn: Arc<dyn lexdb_core::SqlLogger> = second;
        let expected = vec![
            Arc::as_ptr(&first_dyn).cast::<()>() as usize,
            Arc::as_ptr(&second_dyn).cast::<()>() as usize,
        ];
        assert_eq!(restored, expected);
    }

    #[test]
    fn repeated_switches_follow_the_latest_handle() {
        let registry = ModelRegistry::with_database(MockDatabase::handle("a"));
        let words = registry.define("Word", "words");

        for label in ["b", "c", "d"] {
            let db = MockDatabase::handle(label);
            registry.set_database(&db).unwrap();
            assert!(same_database(&words.database().unwrap(), &db));
        }
    }

    #[test]
    fn global_registry_starts_on_a_mock() {
        let db = registry().database().unwrap();
        assert_eq!(db.label(), "mock");
    }
}
