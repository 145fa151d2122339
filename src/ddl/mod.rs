//! DDL statement builder
//!
//! One builder per operation kind, all producing complete SQL text with
//! every value inlined. [`DdlBuilder::build`] dispatches a single
//! [`SchemaOperation`] and returns its statements in execution order
//! (a projection add is followed by its MATERIALIZE, for example).

mod columns;
mod create_table;
mod dictionaries;
mod indexes;
mod operations;
mod projections;
mod views;

use log::debug;

use crate::errors::{MappingError, Result};
use crate::metadata::{DictionaryDescriptor, TableMetadata};
use crate::sql_formatter::qualified_name;
use crate::statement::SqlStatement;
use crate::type_mapping::TypeMappingRegistry;

pub use indexes::merge_index;
pub use operations::{
    IndexDescriptor, MaterializedViewDescriptor, ProjectionDescriptor, SchemaOperation,
    ViewDescriptor,
};

#[derive(Debug, Clone)]
pub struct DdlBuilder {
    registry: TypeMappingRegistry,
    /// Emit `IF [NOT] EXISTS` guards
    idempotent: bool,
    /// Database used for objects declared without a schema
    default_database: Option<String>,
}

impl DdlBuilder {
    pub fn new(registry: TypeMappingRegistry) -> Self {
        Self {
            registry,
            idempotent: true,
            default_database: None,
        }
    }

    pub fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn with_default_database(mut self, database: Option<String>) -> Self {
        self.default_database = database.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn registry(&self) -> &TypeMappingRegistry {
        &self.registry
    }

    pub fn build(&self, operation: &SchemaOperation) -> Result<Vec<SqlStatement>> {
        debug!("Building DDL for {}", operation);

        match operation {
            SchemaOperation::CreateTable { table } => self.create_table_or_derived(table),
            SchemaOperation::DropTable { name, schema } => {
                Ok(vec![self.drop_object("TABLE", schema.as_deref(), name)])
            }
            SchemaOperation::AddColumn {
                table,
                schema,
                column,
                after,
            } => self.add_column(schema.as_deref(), table, column, after.as_deref()),
            SchemaOperation::DropColumn {
                table,
                schema,
                column,
            } => Ok(self.drop_column(schema.as_deref(), table, column)),
            SchemaOperation::AlterColumn {
                table,
                schema,
                column,
            } => self.alter_column(schema.as_deref(), table, column),
            SchemaOperation::RenameColumn {
                table,
                schema,
                from,
                to,
            } => self.rename_column(schema.as_deref(), table, from, to),
            SchemaOperation::CreateIndex {
                table,
                schema,
                index,
            } => self.create_index(schema.as_deref(), table, index),
            SchemaOperation::DropIndex {
                table,
                schema,
                name,
            } => Ok(self.drop_index(schema.as_deref(), table, name)),
            SchemaOperation::CreateMaterializedView { view } => self.create_materialized_view(view),
            SchemaOperation::DropMaterializedView { name, schema }
            | SchemaOperation::DropView { name, schema } => {
                Ok(vec![self.drop_object("VIEW", schema.as_deref(), name)])
            }
            SchemaOperation::CreateDictionary { dictionary } => self.create_dictionary(dictionary),
            SchemaOperation::DropDictionary { name, schema } => {
                Ok(vec![self.drop_object("DICTIONARY", schema.as_deref(), name)])
            }
            SchemaOperation::AddProjection {
                table,
                schema,
                projection,
            } => self.add_projection(schema.as_deref(), table, projection),
            SchemaOperation::DropProjection {
                table,
                schema,
                name,
            } => Ok(self.drop_projection(schema.as_deref(), table, name)),
            SchemaOperation::MaterializeProjection {
                table,
                schema,
                name,
            } => Ok(self.materialize_projection(schema.as_deref(), table, name)),
            SchemaOperation::CreateView { view } => self.create_view(view),
        }
    }

    /// A CreateTable becomes a dictionary or a materialized view when flagged
    fn create_table_or_derived(&self, table: &TableMetadata) -> Result<Vec<SqlStatement>> {
        match (table.is_dictionary()?, table.is_materialized_view()?) {
            (true, true) => Err(MappingError::configuration_with_context(
                "a table cannot be both a dictionary and a materialized view",
                format!("In CREATE TABLE \"{}\"", table.name),
            )),
            (true, false) => self.create_dictionary(&DictionaryDescriptor::from_table(table)?),
            (false, true) => self.create_materialized_view(
                &MaterializedViewDescriptor::from_table(table)?,
            ),
            (false, false) => self.create_table(table),
        }
    }

    fn drop_object(&self, kind: &str, schema: Option<&str>, name: &str) -> SqlStatement {
        SqlStatement::new(
            format!(
                "DROP {}{} {}",
                kind,
                self.if_exists(),
                self.qualified(schema, name)
            ),
            self.display_name(schema, name),
        )
    }

    fn effective_schema<'s>(&'s self, schema: Option<&'s str>) -> Option<&'s str> {
        schema
            .filter(|s| !s.is_empty())
            .or(self.default_database.as_deref())
    }

    pub(crate) fn qualified(&self, schema: Option<&str>, name: &str) -> String {
        qualified_name(self.effective_schema(schema), name)
    }

    /// Qualify a table reference that may already carry a `db.` prefix
    fn qualified_reference(&self, schema: Option<&str>, raw: &str) -> String {
        match raw.split_once('.') {
            Some((db, table)) if !db.is_empty() && !table.is_empty() => {
                qualified_name(Some(db), table)
            }
            _ => self.qualified(schema, raw),
        }
    }

    fn display_name(&self, schema: Option<&str>, name: &str) -> String {
        match self.effective_schema(schema) {
            Some(schema) => format!("{}.{}", schema, name),
            None => name.to_string(),
        }
    }

    fn if_not_exists(&self) -> &'static str {
        if self.idempotent {
            " IF NOT EXISTS"
        } else {
            ""
        }
    }

    fn if_exists(&self) -> &'static str {
        if self.idempotent {
            " IF EXISTS"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{annotations, ColumnDescriptor};
    use crate::type_mapping::ClrType;

    fn builder() -> DdlBuilder {
        DdlBuilder::new(TypeMappingRegistry::new())
    }

    #[test]
    fn test_drop_forms() {
        let b = builder();
        let drop_table = SchemaOperation::DropTable {
            name: "hits".into(),
            schema: Some("analytics".into()),
        };
        let stmts = b.build(&drop_table).unwrap();
        assert_eq!(stmts[0].sql, "DROP TABLE IF EXISTS \"analytics\".\"hits\"");
        assert_eq!(stmts[0].table.as_deref(), Some("analytics.hits"));

        let drop_mv = SchemaOperation::DropMaterializedView {
            name: "daily".into(),
            schema: None,
        };
        assert_eq!(b.build(&drop_mv).unwrap()[0].sql, "DROP VIEW IF EXISTS \"daily\"");

        let drop_dict = SchemaOperation::DropDictionary {
            name: "countries".into(),
            schema: None,
        };
        assert_eq!(
            b.build(&drop_dict).unwrap()[0].sql,
            "DROP DICTIONARY IF EXISTS \"countries\""
        );
    }

    #[test]
    fn test_guards_can_be_disabled() {
        let b = builder().with_idempotent(false);
        let op = SchemaOperation::DropTable {
            name: "hits".into(),
            schema: None,
        };
        assert_eq!(b.build(&op).unwrap()[0].sql, "DROP TABLE \"hits\"");
    }

    #[test]
    fn test_default_database_applies_to_unqualified_objects() {
        let b = builder().with_default_database(Some("analytics".into()));
        let op = SchemaOperation::DropView {
            name: "v".into(),
            schema: None,
        };
        assert_eq!(b.build(&op).unwrap()[0].sql, "DROP VIEW IF EXISTS \"analytics\".\"v\"");
    }

    #[test]
    fn test_create_table_flagged_both_ways_rejected() {
        let table = TableMetadata::new("odd")
            .with_column(ColumnDescriptor::new("Id", ClrType::UInt64))
            .with_annotation(annotations::IS_DICTIONARY, "true")
            .with_annotation(annotations::IS_MATERIALIZED_VIEW, "true");
        let err = builder()
            .build(&SchemaOperation::CreateTable { table })
            .unwrap_err();
        assert!(matches!(err, MappingError::Configuration(_)));
    }

    #[test]
    fn test_qualified_reference_keeps_explicit_database() {
        let b = builder();
        assert_eq!(b.qualified_reference(Some("a"), "b.src"), "\"b\".\"src\"");
        assert_eq!(b.qualified_reference(Some("a"), "src"), "\"a\".\"src\"");
    }
}
