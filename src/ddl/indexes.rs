//! Data-skipping indexes

use crate::errors::{MappingError, Result};
use crate::sql_formatter::{identifier_or_expression, quote_identifier};
use crate::statement::SqlStatement;

use super::operations::IndexDescriptor;
use super::DdlBuilder;

const DEFAULT_INDEX_TYPE: &str = "minmax";
const DEFAULT_GRANULARITY: u64 = 1;

/// Combine two definitions of the same index.
///
/// Settings already present on `existing` are kept and only the missing
/// ones are taken from `incoming`, unless `incoming` asks to be reconfigured.
pub fn merge_index(existing: &IndexDescriptor, incoming: &IndexDescriptor) -> IndexDescriptor {
    let (primary, secondary) = if incoming.reconfigure {
        (incoming, existing)
    } else {
        (existing, incoming)
    };
    IndexDescriptor {
        name: existing.name.clone(),
        columns: if primary.columns.is_empty() {
            secondary.columns.clone()
        } else {
            primary.columns.clone()
        },
        index_type: primary
            .index_type
            .clone()
            .or_else(|| secondary.index_type.clone()),
        granularity: primary.granularity.or(secondary.granularity),
        params: if primary.params.is_empty() {
            secondary.params.clone()
        } else {
            primary.params.clone()
        },
        reconfigure: false,
    }
}

impl DdlBuilder {
    /// `ALTER TABLE "t" ADD INDEX IF NOT EXISTS "ix" (cols) TYPE type(params) GRANULARITY n`
    pub(super) fn create_index(
        &self,
        schema: Option<&str>,
        table: &str,
        index: &IndexDescriptor,
    ) -> Result<Vec<SqlStatement>> {
        let context = format!("In ADD INDEX \"{}\" on \"{}\"", index.name, table);
        if index.name.trim().is_empty() {
            return Err(MappingError::configuration_with_context("index has no name", context));
        }
        if index.columns.is_empty() {
            return Err(MappingError::configuration_with_context(
                "index has no columns",
                context,
            ));
        }

        let index_type = match (index.index_type.as_deref(), index.params.is_empty()) {
            (Some(t), _) if is_valid_type_name(t) => t,
            (Some(t), _) => {
                return Err(MappingError::configuration_with_context(
                    format!("invalid index type '{}'", t),
                    context,
                ))
            }
            (None, true) => DEFAULT_INDEX_TYPE,
            (None, false) => {
                return Err(MappingError::configuration_with_context(
                    "index parameters given without an index type",
                    context,
                ))
            }
        };
        let type_clause = if index.params.is_empty() {
            index_type.to_string()
        } else {
            format!("{}({})", index_type, index.params.join(", "))
        };

        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| identifier_or_expression(c))
            .collect();

        let sql = format!(
            "ALTER TABLE {} ADD INDEX{} {} ({}) TYPE {} GRANULARITY {}",
            self.qualified(schema, table),
            self.if_not_exists(),
            quote_identifier(&index.name),
            columns.join(", "),
            type_clause,
            index.granularity.unwrap_or(DEFAULT_GRANULARITY)
        );
        Ok(vec![SqlStatement::new(sql, self.display_name(schema, table))])
    }

    pub(super) fn drop_index(&self, schema: Option<&str>, table: &str, name: &str) -> Vec<SqlStatement> {
        vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} DROP INDEX{} {}",
                self.qualified(schema, table),
                self.if_exists(),
                quote_identifier(name)
            ),
            self.display_name(schema, table),
        )]
    }
}

fn is_valid_type_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
