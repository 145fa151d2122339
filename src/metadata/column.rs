//! Column descriptors

use serde::{Deserialize, Serialize};

use crate::sql_formatter::to_snake_case;
use crate::type_mapping::ClrType;

use super::annotations::Annotations;

/// Generated-value policy of a column.
///
/// Computed columns are never written by INSERT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "expression", rename_all = "snake_case")]
pub enum ComputedColumn {
    #[default]
    None,
    /// `MATERIALIZED expr`: computed once at insert time and stored
    Materialized(String),
    /// `ALIAS expr`: computed on every read, never stored
    Alias(String),
}

impl ComputedColumn {
    pub fn is_computed(&self) -> bool {
        !matches!(self, ComputedColumn::None)
    }
}

/// One field of a nested (repeated-group) column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedField {
    pub name: String,
    pub clr_type: ClrType,
    #[serde(default)]
    pub nullable: bool,
}

impl NestedField {
    pub fn new(name: impl Into<String>, clr_type: ClrType) -> Self {
        Self {
            name: name.into(),
            clr_type,
            nullable: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Property name on the model side
    pub property: String,
    /// Explicitly mapped column name
    #[serde(default)]
    pub column_name: Option<String>,
    pub clr_type: ClrType,
    #[serde(default)]
    pub nullable: bool,
    /// Explicit dialect column type, overrides the registry mapping
    #[serde(default)]
    pub column_type: Option<String>,
    #[serde(default)]
    pub computed: ComputedColumn,
    /// `DEFAULT expr`
    #[serde(default)]
    pub default_sql: Option<String>,
    /// Non-empty for nested (repeated-group) columns
    #[serde(default)]
    pub nested: Vec<NestedField>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl ColumnDescriptor {
    pub fn new(property: impl Into<String>, clr_type: ClrType) -> Self {
        Self {
            property: property.into(),
            column_name: None,
            clr_type,
            nullable: false,
            column_type: None,
            computed: ComputedColumn::None,
            default_sql: None,
            nested: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    pub fn named(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Explicit column name first, snake_case of the property otherwise.
    pub fn resolved_name(&self) -> String {
        match self.column_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => to_snake_case(&self.property),
        }
    }

    pub fn is_nested(&self) -> bool {
        !self.nested.is_empty()
    }

    /// Whether INSERT statements write this column
    pub fn is_insertable(&self) -> bool {
        !self.computed.is_computed()
    }

    /// `Outer.Field` sub-column names of a nested column
    pub fn nested_column_names(&self) -> Vec<String> {
        let outer = self.resolved_name();
        self.nested
            .iter()
            .map(|field| format!("{}.{}", outer, field.name))
            .collect()
    }
}
