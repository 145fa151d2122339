//! Table descriptors as handed over by the model layer

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};
use crate::sql_formatter::{qualified_name, to_snake_case};
use crate::type_mapping::ClrType;

use super::annotations::{self, Annotations};
use super::column::ColumnDescriptor;
use super::engine::TableEngine;
use super::value_source::ValueSource;

/// Table-function destination (`INSERT INTO FUNCTION postgresql(...)`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalTable {
    /// Table function name, e.g. `postgresql`, `mysql`, `s3`
    pub function: String,
    #[serde(default)]
    pub arguments: Vec<ValueSource>,
    /// External mappings are read-only unless writes are enabled explicitly
    #[serde(default)]
    pub inserts_enabled: bool,
}

impl ExternalTable {
    /// `function('a', 'b', <env:PW>)`
    pub fn render(&self, bindings: &mut Vec<String>) -> Result<String> {
        if self.function.is_empty()
            || !self
                .function
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(MappingError::configuration(format!(
                "invalid table function name '{}'",
                self.function
            )));
        }
        let args = self
            .arguments
            .iter()
            .map(|arg| arg.render(bindings))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}({})", self.function, args.join(", ")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Resolved column names identifying a row
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub external: Option<ExternalTable>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            key_columns: Vec::new(),
            annotations: Annotations::new(),
            external: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_key(mut self, column_name: impl Into<String>) -> Self {
        self.key_columns.push(column_name.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key, value);
        self
    }

    /// `"schema"."name"` or `"name"`
    pub fn qualified_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    /// Name used to tag generated statements for logging
    pub fn display_name(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn engine(&self) -> Result<TableEngine> {
        TableEngine::from_annotations(&self.annotations)
    }

    pub fn is_materialized_view(&self) -> Result<bool> {
        self.annotations.flag(annotations::IS_MATERIALIZED_VIEW)
    }

    pub fn is_dictionary(&self) -> Result<bool> {
        self.annotations.flag(annotations::IS_DICTIONARY)
    }

    pub fn column_by_name(&self, column_name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.resolved_name() == column_name)
    }

    pub fn column_by_property(&self, property: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property == property)
    }

    pub fn column_map(&self) -> ColumnNameMap {
        ColumnNameMap::from_table(self)
    }
}

/// Property → column resolution for one entity.
///
/// Explicit mappings are consulted first; unmapped properties fall back to
/// their snake_case form.
#[derive(Debug, Clone, Default)]
pub struct ColumnNameMap {
    explicit: HashMap<String, String>,
    types: HashMap<String, (ClrType, bool)>,
}

impl ColumnNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: &TableMetadata) -> Self {
        let mut map = Self::new();
        for column in &table.columns {
            if let Some(name) = column.column_name.as_deref().filter(|n| !n.is_empty()) {
                map.explicit.insert(column.property.clone(), name.to_string());
            }
            map.types.insert(
                column.property.clone(),
                (column.clr_type.clone(), column.nullable),
            );
        }
        map
    }

    pub fn with_mapping(mut self, property: impl Into<String>, column: impl Into<String>) -> Self {
        self.explicit.insert(property.into(), column.into());
        self
    }

    pub fn with_type(mut self, property: impl Into<String>, ty: ClrType, nullable: bool) -> Self {
        self.types.insert(property.into(), (ty, nullable));
        self
    }

    pub fn column_for(&self, property: &str) -> String {
        self.explicit
            .get(property)
            .cloned()
            .unwrap_or_else(|| to_snake_case(property))
    }

    pub fn type_of(&self, property: &str) -> Option<&ClrType> {
        self.types.get(property).map(|(ty, _)| ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_and_display_names() {
        let t = TableMetadata::new("hits").with_schema("analytics");
        assert_eq!(t.qualified_name(), "\"analytics\".\"hits\"");
        assert_eq!(t.display_name(), "analytics.hits");
    }

    #[test]
    fn test_column_map_explicit_first() {
        let t = TableMetadata::new("users")
            .with_column(ColumnDescriptor::new("UserId", ClrType::Guid).named("uid"))
            .with_column(ColumnDescriptor::new("CreatedAt", ClrType::DateTime));
        let map = t.column_map();
        assert_eq!(map.column_for("UserId"), "uid");
        assert_eq!(map.column_for("CreatedAt"), "created_at");
        assert_eq!(map.column_for("Unknown"), "unknown");
        assert_eq!(map.type_of("UserId"), Some(&ClrType::Guid));
    }

    #[test]
    fn test_external_table_render() {
        let ext = ExternalTable {
            function: "postgresql".into(),
            arguments: vec![
                ValueSource::literal("pg:5432"),
                ValueSource::literal("shop"),
                ValueSource::literal("orders"),
                ValueSource::env("PG_USER"),
                ValueSource::env("PG_PASSWORD"),
            ],
            inserts_enabled: true,
        };
        let mut bindings = Vec::new();
        assert_eq!(
            ext.render(&mut bindings).unwrap(),
            "postgresql('pg:5432', 'shop', 'orders', <env:PG_USER>, <env:PG_PASSWORD>)"
        );
        assert_eq!(bindings, vec!["PG_USER", "PG_PASSWORD"]);
    }

    #[test]
    fn test_external_function_name_validated() {
        let ext = ExternalTable {
            function: "drop table x; --".into(),
            arguments: vec![],
            inserts_enabled: true,
        };
        assert!(ext.render(&mut Vec::new()).is_err());
    }
}
