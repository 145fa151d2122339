//! Schema operation descriptors
//!
//! One migration is an unordered list of these; the phase sorter orders them
//! and [`super::DdlBuilder`] turns each one into statements.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};
use crate::expression::Expr;
use crate::metadata::{annotations, Annotations, ColumnDescriptor, DictionaryDescriptor, TableMetadata};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaOperation {
    /// Plain table, or a materialized view / dictionary when the table's
    /// flag annotations say so
    CreateTable { table: TableMetadata },
    DropTable {
        name: String,
        #[serde(default)]
        schema: Option<String>,
    },
    AddColumn {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        column: ColumnDescriptor,
        #[serde(default)]
        after: Option<String>,
    },
    DropColumn {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        column: String,
    },
    AlterColumn {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        column: ColumnDescriptor,
    },
    RenameColumn {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        from: String,
        to: String,
    },
    CreateIndex {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        index: IndexDescriptor,
    },
    DropIndex {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        name: String,
    },
    CreateMaterializedView { view: MaterializedViewDescriptor },
    DropMaterializedView {
        name: String,
        #[serde(default)]
        schema: Option<String>,
    },
    CreateDictionary { dictionary: DictionaryDescriptor },
    DropDictionary {
        name: String,
        #[serde(default)]
        schema: Option<String>,
    },
    AddProjection {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        projection: ProjectionDescriptor,
    },
    DropProjection {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        name: String,
    },
    MaterializeProjection {
        table: String,
        #[serde(default)]
        schema: Option<String>,
        name: String,
    },
    CreateView { view: ViewDescriptor },
    DropView {
        name: String,
        #[serde(default)]
        schema: Option<String>,
    },
}

impl SchemaOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaOperation::CreateTable { .. } => "CreateTable",
            SchemaOperation::DropTable { .. } => "DropTable",
            SchemaOperation::AddColumn { .. } => "AddColumn",
            SchemaOperation::DropColumn { .. } => "DropColumn",
            SchemaOperation::AlterColumn { .. } => "AlterColumn",
            SchemaOperation::RenameColumn { .. } => "RenameColumn",
            SchemaOperation::CreateIndex { .. } => "CreateIndex",
            SchemaOperation::DropIndex { .. } => "DropIndex",
            SchemaOperation::CreateMaterializedView { .. } => "CreateMaterializedView",
            SchemaOperation::DropMaterializedView { .. } => "DropMaterializedView",
            SchemaOperation::CreateDictionary { .. } => "CreateDictionary",
            SchemaOperation::DropDictionary { .. } => "DropDictionary",
            SchemaOperation::AddProjection { .. } => "AddProjection",
            SchemaOperation::DropProjection { .. } => "DropProjection",
            SchemaOperation::MaterializeProjection { .. } => "MaterializeProjection",
            SchemaOperation::CreateView { .. } => "CreateView",
            SchemaOperation::DropView { .. } => "DropView",
        }
    }

    /// `(schema, name)` of the table or object the operation targets
    pub fn target(&self) -> (Option<&str>, &str) {
        match self {
            SchemaOperation::CreateTable { table } => (table.schema.as_deref(), table.name.as_str()),
            SchemaOperation::CreateMaterializedView { view } => (view.schema.as_deref(), view.name.as_str()),
            SchemaOperation::CreateDictionary { dictionary } => {
                (dictionary.schema.as_deref(), dictionary.name.as_str())
            }
            SchemaOperation::CreateView { view } => (view.schema.as_deref(), view.name.as_str()),
            SchemaOperation::DropTable { name, schema }
            | SchemaOperation::DropMaterializedView { name, schema }
            | SchemaOperation::DropDictionary { name, schema }
            | SchemaOperation::DropView { name, schema } => (schema.as_deref(), name.as_str()),
            SchemaOperation::AddColumn { table, schema, .. }
            | SchemaOperation::DropColumn { table, schema, .. }
            | SchemaOperation::AlterColumn { table, schema, .. }
            | SchemaOperation::RenameColumn { table, schema, .. }
            | SchemaOperation::CreateIndex { table, schema, .. }
            | SchemaOperation::DropIndex { table, schema, .. }
            | SchemaOperation::AddProjection { table, schema, .. }
            | SchemaOperation::DropProjection { table, schema, .. }
            | SchemaOperation::MaterializeProjection { table, schema, .. } => {
                (schema.as_deref(), table.as_str())
            }
        }
    }

    /// `db.name` or `name`, for logging
    pub fn target_display(&self) -> String {
        match self.target() {
            (Some(schema), name) if !schema.is_empty() => format!("{}.{}", schema, name),
            (_, name) => name.to_string(),
        }
    }
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaOperation::CreateIndex { index, .. } => {
                write!(f, "{}({} on {})", self.kind(), index.name, self.target_display())
            }
            SchemaOperation::DropIndex { name, .. }
            | SchemaOperation::DropProjection { name, .. }
            | SchemaOperation::MaterializeProjection { name, .. } => {
                write!(f, "{}({} on {})", self.kind(), name, self.target_display())
            }
            SchemaOperation::AddProjection { projection, .. } => write!(
                f,
                "{}({} on {})",
                self.kind(),
                projection.name,
                self.target_display()
            ),
            _ => write!(f, "{}({})", self.kind(), self.target_display()),
        }
    }
}

/// Data-skipping index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    /// Indexed columns or expressions
    pub columns: Vec<String>,
    /// `minmax`, `set`, `bloom_filter`, `tokenbf_v1`, ...
    #[serde(default)]
    pub index_type: Option<String>,
    #[serde(default)]
    pub granularity: Option<u64>,
    /// Raw arguments of the index type, e.g. `["0.01"]` for `bloom_filter(0.01)`
    #[serde(default)]
    pub params: Vec<String>,
    /// Replace the settings of an existing definition instead of merging into it
    #[serde(default)]
    pub reconfigure: bool,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            index_type: None,
            granularity: None,
            params: Vec::new(),
            reconfigure: false,
        }
    }

    pub fn with_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    pub fn with_granularity(mut self, granularity: u64) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }
}

/// Materialized view declared directly or through a flagged CreateTable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterializedViewDescriptor {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Table the view reads from
    pub source_table: String,
    /// SELECT text; defaults to `SELECT * FROM <source>`
    #[serde(default)]
    pub query: Option<String>,
    /// Existing target table (`TO "t"`); without one the view stores its own data
    #[serde(default)]
    pub to_table: Option<String>,
    /// Column list of the implicit target table
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Engine and sorting annotations of the implicit target table
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub populate: bool,
}

impl MaterializedViewDescriptor {
    pub fn from_table(table: &TableMetadata) -> Result<Self> {
        let ann = &table.annotations;
        let source_table = ann
            .get(annotations::MATERIALIZED_VIEW_SOURCE)
            .map(str::to_string)
            .ok_or_else(|| {
                MappingError::configuration_with_context(
                    "materialized view has no source table",
                    format!("In CREATE MATERIALIZED VIEW \"{}\"", table.name),
                )
            })?;
        Ok(Self {
            name: table.name.clone(),
            schema: table.schema.clone(),
            source_table,
            query: ann.get(annotations::MATERIALIZED_VIEW_QUERY).map(str::to_string),
            to_table: ann.get(annotations::MATERIALIZED_VIEW_TO).map(str::to_string),
            columns: table.columns.clone(),
            annotations: table.annotations.clone(),
            populate: ann.flag(annotations::MATERIALIZED_VIEW_POPULATE)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectionDescriptor {
    pub name: String,
    /// `SELECT ...` body placed inside the projection's parentheses
    pub query: String,
    /// Emit `MATERIALIZE PROJECTION` right after adding it
    #[serde(default = "default_materialize")]
    pub materialize: bool,
}

fn default_materialize() -> bool {
    true
}

/// Parameterized view over one source table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewDescriptor {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub source_table: String,
    #[serde(default)]
    pub source_schema: Option<String>,
    /// Source columns used for property → column resolution
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Selected properties; empty selects `*`
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub predicate: Option<Expr>,
}
