//! Runtime table-schema declaration.
//!
//! Model classes declare their table shape with a [`TableSchema`]; the
//! declaration renders to a CREATE TABLE statement the class can execute
//! against its bound database.

use lexdb_core::error::{SchemaError, SchemaErrorKind};
use lexdb_core::{Error, Result};

/// SQL column affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// INTEGER affinity
    Integer,
    /// REAL affinity
    Real,
    /// TEXT affinity
    Text,
    /// BLOB affinity
    Blob,
}

impl ColumnType {
    /// The SQL name of this affinity.
    pub const fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// One declared column.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    primary_key: bool,
    unique: bool,
    default: Option<String>,
    references: Option<(String, String)>,
}

impl ColumnDef {
    /// Declare a column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    /// Declare an INTEGER column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Declare a TEXT column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Declare a REAL column.
    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    /// Mark this column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark this column as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Add a UNIQUE constraint.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a DEFAULT expression (rendered verbatim).
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Add a foreign-key reference to `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some((table.into(), column.into()));
        self
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> String {
        let mut def = format!("  {} {}", self.name, self.column_type.sql_name());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if !self.nullable && !self.primary_key {
            def.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }
}

/// A declared table shape.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnDef>,
    if_not_exists: bool,
}

impl TableSchema {
    /// Start a declaration for the given table.
    pub fn builder(table: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            table: table.into(),
            columns: Vec::new(),
            if_not_exists: false,
        }
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The declared columns, in order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Render the CREATE TABLE statement.
    pub fn create_sql(&self) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.table);
        sql.push_str(" (\n");

        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::definition).collect();
        for column in &self.columns {
            if let Some((table, referenced)) = &column.references {
                parts.push(format!(
                    "  FOREIGN KEY ({}) REFERENCES {table}({referenced})",
                    column.name
                ));
            }
        }

        sql.push_str(&parts.join(",\n"));
        sql.push_str("\n)");
        sql
    }

    /// Render the DROP TABLE statement.
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug)]
pub struct TableSchemaBuilder {
    table: String,
    columns: Vec<ColumnDef>,
    if_not_exists: bool,
}

impl TableSchemaBuilder {
    /// Add a column declaration.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Add IF NOT EXISTS to the rendered statement.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Finish the declaration; fails on an empty or duplicated column list.
    pub fn build(self) -> Result<TableSchema> {
        if self.columns.is_empty() {
            return Err(Error::Schema(SchemaError {
                kind: SchemaErrorKind::Invalid,
                message: format!("table '{}' declares no columns", self.table),
            }));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::Schema(SchemaError {
                    kind: SchemaErrorKind::Invalid,
                    message: format!(
                        "table '{}' declares column '{}' twice",
                        self.table, column.name
                    ),
                }));
            }
        }
        Ok(TableSchema {
            table: self.table,
            columns: self.columns,
            if_not_exists: self.if_not_exists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_create_table() {
        let schema = TableSchema::builder("words")
            .column(ColumnDef::integer("wordid").primary_key())
            .column(ColumnDef::text("lemma").not_null().unique())
            .build()
            .unwrap();

        let sql = schema.create_sql();
        assert_eq!(
            sql,
            "CREATE TABLE words (\n  wordid INTEGER PRIMARY KEY,\n  lemma TEXT NOT NULL UNIQUE\n)"
        );
    }

    #[test]
    fn renders_foreign_keys_and_defaults() {
        let schema = TableSchema::builder("senses")
            .if_not_exists()
            .column(ColumnDef::integer("senseid").primary_key())
            .column(
                ColumnDef::integer("wordid")
                    .not_null()
                    .references("words", "wordid"),
            )
            .column(ColumnDef::integer("rank").default_value("0"))
            .build()
            .unwrap();

        let sql = schema.create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS senses"));
        assert!(sql.contains("  wordid INTEGER NOT NULL"));
        assert!(sql.contains("  rank INTEGER DEFAULT 0"));
        assert!(sql.contains("  FOREIGN KEY (wordid) REFERENCES words(wordid)"));
    }

    #[test]
    fn rejects_empty_and_duplicate_columns() {
        assert!(TableSchema::builder("empty").build().is_err());

        let err = TableSchema::builder("words")
            .column(ColumnDef::text("lemma"))
            .column(ColumnDef::text("lemma"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn drop_sql() {
        let schema = TableSchema::builder("words")
            .column(ColumnDef::text("lemma"))
            .build()
            .unwrap();
        assert_eq!(schema.drop_sql(), "DROP TABLE IF EXISTS words");
    }
}
