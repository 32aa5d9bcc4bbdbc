//! Model-class objects.
//!
//! A [`ModelClass`] is the runtime stand-in for an ORM model class: it holds
//! the class's current database handle, its dataset binding, its declared
//! table schema, and its validation rules. Classes are created through a
//! [`ModelRegistry`](crate::ModelRegistry) — either named, at definition
//! time, or anonymously through the memoizing factory — and are shared as
//! `Arc<ModelClass>` so the factory can hand back the identical object for
//! repeated lookups.

use crate::schema::TableSchema;
use lexdb_core::error::ConfigError;
use lexdb_core::{Dataset, DbHandle, Error, Result, Row, ValidationRule, validate_row};
use std::fmt;
use std::sync::RwLock;

/// A database-backed model class.
pub struct ModelClass {
    name: String,
    /// Table this class was defined over; anonymous dataset-bound classes
    /// carry their table/query form in the dataset instead.
    table: Option<String>,
    db: RwLock<Option<DbHandle>>,
    dataset: RwLock<Option<Dataset>>,
    schema: RwLock<Option<TableSchema>>,
    validations: RwLock<Vec<ValidationRule>>,
}

impl ModelClass {
    pub(crate) fn new(name: impl Into<String>, table: Option<String>) -> Self {
        Self {
            name: name.into(),
            table,
            db: RwLock::new(None),
            dataset: RwLock::new(None),
            schema: RwLock::new(None),
            validations: RwLock::new(Vec::new()),
        }
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table this class was defined over, if any.
    pub fn table(&self) -> Option<String> {
        self.table.clone()
    }

    /// The currently bound database handle.
    pub fn database(&self) -> Option<DbHandle> {
        self.db.read().unwrap().clone()
    }

    /// The current dataset binding.
    pub fn dataset(&self) -> Option<Dataset> {
        self.dataset.read().unwrap().clone()
    }

    /// Bind this class directly to a database handle.
    ///
    /// Probes the handle first; the probe statement runs through the normal
    /// logging path, so callers that need a silent bind suspend the handle's
    /// sinks around this call.
    pub fn bind_database(&self, db: &DbHandle) -> Result<()> {
        db.ping()?;
        self.attach_database(db);
        Ok(())
    }

    /// Install a handle without probing.
    ///
    /// Used at definition time and when the registry propagates a connection
    /// switch. Table-defined classes get their dataset rebuilt against the
    /// new handle; dataset-bound classes keep their form and are re-targeted.
    pub(crate) fn attach_database(&self, db: &DbHandle) {
        let mut dataset = self.dataset.write().unwrap();
        if let Some(table) = &self.table {
            *dataset = Some(Dataset::table(db.clone(), table.clone()));
        } else if let Some(existing) = dataset.take() {
            *dataset = Some(existing.with_database(db.clone()));
        }
        *self.db.write().unwrap() = Some(db.clone());
    }

    /// Bind this class to a specific dataset.
    ///
    /// The class's handle becomes the dataset's handle, but the binding is to
    /// the descriptor itself.
    pub fn bind_dataset(&self, dataset: Dataset) {
        *self.db.write().unwrap() = Some(dataset.database().clone());
        *self.dataset.write().unwrap() = Some(dataset);
    }

    /// Declare the table schema for this class.
    pub fn declare_schema(&self, schema: TableSchema) {
        *self.schema.write().unwrap() = Some(schema);
    }

    /// The declared schema, if any.
    pub fn schema(&self) -> Option<TableSchema> {
        self.schema.read().unwrap().clone()
    }

    /// Create this class's table on the bound database.
    pub fn create_table(&self) -> Result<()> {
        let schema = self.schema().ok_or_else(|| self.unconfigured("schema"))?;
        let db = self.database().ok_or_else(|| self.unconfigured("database"))?;
        db.execute(&schema.create_sql(), &[])?;
        tracing::debug!(model = %self.name, table = schema.table(), "created table");
        Ok(())
    }

    /// Add a validation rule.
    pub fn add_validation(&self, rule: ValidationRule) {
        self.validations.write().unwrap().push(rule);
    }

    /// The declared validation rules, in declaration order.
    pub fn validations(&self) -> Vec<ValidationRule> {
        self.validations.read().unwrap().clone()
    }

    /// Validate a row against the declared rules.
    pub fn validate(&self, row: &Row) -> Result<()> {
        let rules = self.validations.read().unwrap();
        validate_row(&rules, row).map_err(Error::from)
    }

    /// Fetch every row of this class's dataset.
    pub fn all(&self) -> Result<Vec<Row>> {
        self.require_dataset()?.all()
    }

    /// Fetch the first row of this class's dataset, if any.
    pub fn first(&self) -> Result<Option<Row>> {
        self.require_dataset()?.first()
    }

    /// Count the rows of this class's dataset.
    pub fn count(&self) -> Result<u64> {
        self.require_dataset()?.count()
    }

    fn require_dataset(&self) -> Result<Dataset> {
        self.dataset().ok_or_else(|| self.unconfigured("dataset"))
    }

    fn unconfigured(&self, what: &str) -> Error {
        Error::Config(ConfigError {
            message: format!("model class '{}' has no {what}", self.name),
            source: None,
        })
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field("table", &self.table)
            .field(
                "database",
                &self.database().map(|db| db.label().to_string()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, TableSchema};
    use lexdb_core::{Database, MemoryLogger, MockDatabase, Value};

    fn words_class() -> ModelClass {
        ModelClass::new("Word", Some("words".to_string()))
    }

    #[test]
    fn attach_builds_dataset_for_table_classes() {
        let class = words_class();
        assert!(class.database().is_none());

        let db = MockDatabase::handle("a");
        class.attach_database(&db);

        let dataset = class.dataset().unwrap();
        assert_eq!(dataset.select_sql(), "SELECT * FROM words");
        assert!(lexdb_core::same_database(&class.database().unwrap(), &db));
    }

    #[test]
    fn bind_database_probes_through_the_log_path() {
        let mock = MockDatabase::new("probe");
        let sink = MemoryLogger::new();
        mock.loggers().add(sink.clone());
        let db: DbHandle = std::sync::Arc::new(mock);

        let class = words_class();
        class.bind_database(&db).unwrap();
        assert_eq!(sink.statements(), vec!["SELECT 1"]);
    }

    #[test]
    fn bind_database_fails_when_probe_fails() {
        let mock = MockDatabase::new("bad");
        mock.fail_on("SELECT 1");
        let db: DbHandle = std::sync::Arc::new(mock);

        let class = words_class();
        assert!(class.bind_database(&db).is_err());
        assert!(class.database().is_none());
    }

    #[test]
    fn dataset_binding_keeps_the_descriptor() {
        let db = MockDatabase::handle("a");
        let dataset = Dataset::from_sql(db.clone(), "SELECT lemma FROM words WHERE wordid < 10");

        let class = ModelClass::new("recent_words", None);
        class.bind_dataset(dataset.clone());

        assert_eq!(class.dataset().unwrap(), dataset);
        assert!(lexdb_core::same_database(&class.database().unwrap(), &db));

        // a switch re-targets the descriptor but keeps its form
        let next = MockDatabase::handle("b");
        class.attach_database(&next);
        let moved = class.dataset().unwrap();
        assert_eq!(moved.select_sql(), dataset.select_sql());
        assert!(lexdb_core::same_database(moved.database(), &next));
    }

    #[test]
    fn create_table_executes_the_declaration() {
        let mock = std::sync::Arc::new(MockDatabase::new("ddl"));
        let db: DbHandle = mock.clone();
        let class = words_class();
        class.attach_database(&db);
        class.declare_schema(
            TableSchema::builder("words")
                .column(ColumnDef::integer("wordid").primary_key())
                .column(ColumnDef::text("lemma").not_null())
                .build()
                .unwrap(),
        );

        class.create_table().unwrap();
        let executed = mock.executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("CREATE TABLE words"));
    }

    #[test]
    fn unbound_class_reports_configuration_errors() {
        let class = words_class();
        assert!(matches!(class.all(), Err(Error::Config(_))));
        assert!(matches!(class.count(), Err(Error::Config(_))));
        assert!(matches!(class.create_table(), Err(Error::Config(_))));
    }

    #[test]
    fn validations_accumulate_and_apply() {
        let class = words_class();
        class.add_validation(ValidationRule::presence("lemma"));
        class.add_validation(ValidationRule::length("lemma", Some(1), Some(80)));
        assert_eq!(class.validations().len(), 2);

        let good = Row::new(
            vec!["lemma".to_string()],
            vec![Value::Text("run".to_string())],
        );
        class.validate(&good).unwrap();

        let bad = Row::new(vec!["lemma".to_string()], vec![Value::Null]);
        assert!(matches!(class.validate(&bad), Err(Error::Validation(_))));
    }
}
