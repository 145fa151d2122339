//! Row DELETE by key columns

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};
use crate::metadata::TableMetadata;
use crate::sql_formatter::{qualified_name, quote_identifier, render_literal, LiteralStyle, SqlValue};
use crate::statement::SqlStatement;

use super::{lookup, RowValues};

/// How a row deletion is issued, chosen once per connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStrategy {
    /// `DELETE FROM ... WHERE ...`: rows are masked immediately and removed on merge
    #[default]
    Lightweight,
    /// `ALTER TABLE ... DELETE WHERE ...`: an asynchronous rewrite of data parts
    Mutation,
}

impl std::str::FromStr for DeleteStrategy {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lightweight" => Ok(DeleteStrategy::Lightweight),
            "mutation" => Ok(DeleteStrategy::Mutation),
            other => Err(MappingError::configuration(format!(
                "unknown delete strategy '{}', expected 'lightweight' or 'mutation'",
                other
            ))),
        }
    }
}

pub fn build_delete(
    table: &TableMetadata,
    keys: &RowValues,
    strategy: DeleteStrategy,
    default_database: Option<&str>,
) -> Result<SqlStatement> {
    let context = format!("While building DELETE for \"{}\"", table.name);
    if let Some(external) = &table.external {
        return Err(MappingError::unsupported_operation(format!(
            "cannot delete through the table function {}() mapped by \"{}\"",
            external.function, table.name
        )));
    }
    if table.key_columns.is_empty() {
        return Err(MappingError::configuration_with_context(
            "table has no key columns",
            context,
        ));
    }

    let predicates = table
        .key_columns
        .iter()
        .map(|key| {
            let column = table.column_by_name(key).ok_or_else(|| {
                MappingError::configuration_with_context(
                    format!("key column \"{}\" is not a column of the table", key),
                    context.clone(),
                )
            })?;
            let value = lookup(keys, column).ok_or_else(|| {
                MappingError::invalid_value(
                    format!("\"{}\".\"{}\"", table.name, key),
                    "no key value supplied",
                )
            })?;
            Ok(match value {
                SqlValue::Null => format!("{} IS NULL", quote_identifier(key)),
                value => format!(
                    "{} = {}",
                    quote_identifier(key),
                    render_literal(value, Some(&column.clr_type), LiteralStyle::VALUES)
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let target = qualified_name(table.schema.as_deref().or(default_database), &table.name);
    let predicate = predicates.join(" AND ");
    let sql = match strategy {
        DeleteStrategy::Lightweight => format!("DELETE FROM {} WHERE {}", target, predicate),
        DeleteStrategy::Mutation => format!("ALTER TABLE {} DELETE WHERE {}", target, predicate),
    };
    Ok(SqlStatement::new(sql, table.display_name()))
}
