//! Memoization behavior of the anonymous model-class factory.

use lexdb::prelude::*;
use std::sync::Arc;

#[test]
fn equal_handles_return_the_identical_class() {
    let registry = ModelRegistry::new();
    let conn1 = MockDatabase::handle("conn1");

    let first = registry.model_for(conn1.clone()).unwrap();
    let second = registry.model_for(conn1).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let conn2 = MockDatabase::handle("conn2");
    let third = registry.model_for(conn2).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn equal_datasets_return_the_identical_class() {
    let registry = ModelRegistry::new();
    let db = MockDatabase::handle("conn");

    let first = registry
        .model_for(Dataset::table(db.clone(), "words"))
        .unwrap();
    let second = registry
        .model_for(Dataset::table(db.clone(), "words"))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = registry
        .model_for(Dataset::table(db, "senses"))
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}

#[test]
fn binding_depends_on_the_source_kind() {
    let registry = ModelRegistry::new();
    let db = MockDatabase::handle("conn");

    let by_handle = registry.model_for(db.clone()).unwrap();
    assert!(lexdb::same_database(&by_handle.database().unwrap(), &db));
    assert!(by_handle.dataset().is_none());

    let dataset = Dataset::from_sql(db, "SELECT lemma FROM words WHERE wordid < 100");
    let by_dataset = registry.model_for(dataset.clone()).unwrap();
    assert_eq!(by_dataset.dataset().unwrap(), dataset);
    assert!(!Arc::ptr_eq(&by_handle, &by_dataset));
}

#[test]
fn global_factory_memoizes_across_call_sites() {
    let conn = MockDatabase::handle("shared");
    let first = model(conn.clone()).unwrap();
    let second = model(conn).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn construction_is_silent_and_cache_hits_run_nothing() {
    let registry = ModelRegistry::new();
    let mock = Arc::new(MockDatabase::new("conn"));
    let sink = MemoryLogger::new();
    mock.loggers().add(sink.clone());
    let db: DbHandle = mock.clone();

    registry.model_for(db.clone()).unwrap();
    let statements_after_build = mock.executed().len();
    assert!(sink.is_empty());

    registry.model_for(db).unwrap();
    assert_eq!(mock.executed().len(), statements_after_build);
}
