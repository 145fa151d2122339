//! Bulk INSERT
//!
//! ```sql
//! INSERT INTO "events" ("id", "name", "goals.ID", "goals.EventTime")
//! VALUES (1, 'a', [1, 2], ['2024-01-01 00:00:00', '2024-01-02 00:00:00']), (...)
//! ```
//!
//! Nested columns expand into one parallel array per field. Each array is
//! extracted from the same element list, so every field of one group has
//! the same element count per row.

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};
use crate::metadata::{ColumnDescriptor, TableMetadata};
use crate::sql_formatter::{qualified_name, quote_identifier, render_literal, LiteralStyle, SqlValue};
use crate::statement::SqlStatement;
use crate::type_mapping::{ClrType, EnumStorage};

use super::{lookup, RowValues};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertFormat {
    /// `VALUES (...), (...)`
    #[default]
    Values,
    /// `FORMAT JSONEachRow` followed by one JSON object per line
    JsonEachRow,
}

impl std::str::FromStr for InsertFormat {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "values" => Ok(InsertFormat::Values),
            "json_each_row" | "jsoneachrow" => Ok(InsertFormat::JsonEachRow),
            other => Err(MappingError::configuration(format!(
                "unknown insert format '{}', expected 'values' or 'json_each_row'",
                other
            ))),
        }
    }
}

/// Options shared by every INSERT of one batch
#[derive(Debug, Clone)]
pub struct InsertOptions<'a> {
    pub format: InsertFormat,
    pub max_rows: usize,
    pub default_database: Option<&'a str>,
}

/// One INSERT destination column (a nested column contributes one per field)
struct TargetColumn<'a> {
    name: String,
    column: &'a ColumnDescriptor,
    /// Index into `column.nested` for nested sub-columns
    nested_field: Option<usize>,
}

impl TargetColumn<'_> {
    fn declared_type(&self) -> ClrType {
        match self.nested_field {
            Some(i) => ClrType::array_of(self.column.nested[i].clr_type.clone()),
            None => self.column.clr_type.clone(),
        }
    }
}

fn target_columns(table: &TableMetadata) -> Vec<TargetColumn<'_>> {
    let mut targets = Vec::new();
    for column in table.columns.iter().filter(|c| c.is_insertable()) {
        if column.is_nested() {
            for (i, name) in column.nested_column_names().into_iter().enumerate() {
                targets.push(TargetColumn {
                    name,
                    column,
                    nested_field: Some(i),
                });
            }
        } else {
            targets.push(TargetColumn {
                name: column.resolved_name(),
                column,
                nested_field: None,
            });
        }
    }
    targets
}

/// Build the INSERT statements for `rows`, split into chunks of
/// `options.max_rows`.
pub fn build_insert(
    table: &TableMetadata,
    rows: &[RowValues],
    options: &InsertOptions<'_>,
) -> Result<Vec<SqlStatement>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut bindings = Vec::new();
    let destination = match &table.external {
        Some(external) if !external.inserts_enabled => {
            return Err(MappingError::unsupported_operation(format!(
                "table \"{}\" maps to the read-only table function {}(); enable inserts on the mapping to write to it",
                table.name, external.function
            )))
        }
        Some(external) => format!("FUNCTION {}", external.render(&mut bindings)?),
        None => qualified_name(
            table.schema.as_deref().or(options.default_database),
            &table.name,
        ),
    };

    let targets = target_columns(table);
    if targets.is_empty() {
        return Err(MappingError::configuration(format!(
            "table \"{}\" has no writable columns",
            table.name
        )));
    }
    let column_list = targets
        .iter()
        .map(|t| quote_identifier(&t.name))
        .collect::<Vec<_>>()
        .join(", ");

    let header = format!("INSERT INTO {} ({})", destination, column_list);
    let mut statements = Vec::new();
    for chunk in rows.chunks(options.max_rows.max(1)) {
        let body = match options.format {
            InsertFormat::Values => values_body(table, &targets, chunk)?,
            InsertFormat::JsonEachRow => json_each_row_body(table, &targets, chunk)?,
        };
        statements.push(
            SqlStatement::new(format!("{} {}", header, body), table.display_name())
                .with_env_bindings(bindings.clone()),
        );
    }
    Ok(statements)
}

fn values_body(table: &TableMetadata, targets: &[TargetColumn<'_>], rows: &[RowValues]) -> Result<String> {
    let tuples = rows
        .iter()
        .map(|row| {
            let cells = row_cells(table, targets, row)?;
            let rendered: Vec<String> = targets
                .iter()
                .zip(&cells)
                .map(|(target, value)| render_literal(value, Some(&target.declared_type()), LiteralStyle::VALUES))
                .collect();
            Ok(format!("({})", rendered.join(", ")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("VALUES {}", tuples.join(", ")))
}

fn json_each_row_body(
    table: &TableMetadata,
    targets: &[TargetColumn<'_>],
    rows: &[RowValues],
) -> Result<String> {
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row_cells(table, targets, row)?;
        let mut object = serde_json::Map::new();
        for (target, value) in targets.iter().zip(&cells) {
            object.insert(target.name.clone(), json_value(value, &target.declared_type()));
        }
        let line = serde_json::to_string(&serde_json::Value::Object(object)).map_err(|e| {
            MappingError::invalid_value(format!("row of \"{}\"", table.name), e.to_string())
        })?;
        lines.push(line);
    }
    Ok(format!("FORMAT JSONEachRow\n{}", lines.join("\n")))
}

fn json_value(value: &SqlValue, declared: &ClrType) -> serde_json::Value {
    match (value, declared) {
        (SqlValue::Enum { name, .. }, ClrType::Enum(EnumStorage::Name)) => {
            serde_json::Value::String(name.clone())
        }
        (SqlValue::Array(items), ClrType::Array(element)) => {
            serde_json::Value::Array(items.iter().map(|item| json_value(item, element)).collect())
        }
        _ => value.to_json(),
    }
}

/// One value per target column, nested groups already split into arrays.
fn row_cells(table: &TableMetadata, targets: &[TargetColumn<'_>], row: &RowValues) -> Result<Vec<SqlValue>> {
    targets
        .iter()
        .map(|target| match target.nested_field {
            Some(field) => nested_field_values(table, target.column, field, row),
            None => match lookup(row, target.column) {
                Some(value) if value.is_null() && !target.column.nullable => {
                    Err(missing_value(table, target.column))
                }
                Some(value) => Ok(value.clone()),
                None if target.column.nullable => Ok(SqlValue::Null),
                None => Err(missing_value(table, target.column)),
            },
        })
        .collect()
}

fn missing_value(table: &TableMetadata, column: &ColumnDescriptor) -> MappingError {
    MappingError::invalid_value(
        format!("\"{}\".\"{}\"", table.name, column.resolved_name()),
        "non-nullable column has no value",
    )
}

/// Extract one field from every element of a nested column's collection.
///
/// An element that is not a record, or that lacks the field, is an error:
/// skipping it would leave this field's array shorter than its siblings.
fn nested_field_values(
    table: &TableMetadata,
    column: &ColumnDescriptor,
    field_index: usize,
    row: &RowValues,
) -> Result<SqlValue> {
    let field = &column.nested[field_index];
    let target = format!("\"{}\".\"{}.{}\"", table.name, column.resolved_name(), field.name);
    let elements = match lookup(row, column) {
        None | Some(SqlValue::Null) => return Ok(SqlValue::Array(Vec::new())),
        Some(SqlValue::Array(elements)) => elements,
        Some(other) => {
            return Err(MappingError::invalid_value(
                target,
                format!("expected a collection of records, got {:?}", other),
            ))
        }
    };

    elements
        .iter()
        .enumerate()
        .map(|(i, element)| match element {
            SqlValue::Record(_) => element.field(&field.name).cloned().ok_or_else(|| {
                MappingError::invalid_value(
                    target.clone(),
                    format!("element {} has no field '{}'", i, field.name),
                )
            }),
            other => Err(MappingError::invalid_value(
                target.clone(),
                format!("element {} is not a record: {:?}", i, other),
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(SqlValue::Array)
}
