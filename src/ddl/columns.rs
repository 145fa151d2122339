//! Column definitions and `ALTER TABLE` column changes

use crate::errors::{MappingError, Result};
use crate::metadata::{annotations, ColumnDescriptor, ComputedColumn};
use crate::sql_formatter::{quote_identifier, quote_string, StringEscape};
use crate::statement::SqlStatement;

use super::DdlBuilder;

impl DdlBuilder {
    /// `"name" Type [DEFAULT|MATERIALIZED|ALIAS expr] [COMMENT '...'] [CODEC(...)]`
    pub(super) fn column_definition(&self, column: &ColumnDescriptor) -> Result<String> {
        let name = column.resolved_name();
        let mut definition = format!(
            "{} {}",
            quote_identifier(&name),
            self.registry.map_column(column)?
        );

        let default_sql = column
            .default_sql
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let context = || format!("In column \"{}\"", name);

        match (&column.computed, default_sql) {
            (ComputedColumn::None, None) => {}
            (ComputedColumn::None, Some(default)) => {
                definition.push_str(&format!(" DEFAULT {}", default));
            }
            (ComputedColumn::Materialized(expr), None) | (ComputedColumn::Alias(expr), None) => {
                if expr.trim().is_empty() {
                    return Err(MappingError::configuration_with_context(
                        "computed column has an empty expression",
                        context(),
                    ));
                }
                let keyword = if matches!(column.computed, ComputedColumn::Materialized(_)) {
                    "MATERIALIZED"
                } else {
                    "ALIAS"
                };
                definition.push_str(&format!(" {} {}", keyword, expr.trim()));
            }
            (_, Some(_)) => {
                return Err(MappingError::configuration_with_context(
                    "a computed column cannot also declare a DEFAULT",
                    context(),
                ));
            }
        }

        if let Some(comment) = column.annotations.get(annotations::COMMENT) {
            definition.push_str(&format!(
                " COMMENT {}",
                quote_string(comment, StringEscape::QuoteDoubling)
            ));
        }
        if let Some(codec) = column.annotations.get(annotations::CODEC) {
            definition.push_str(&format!(" CODEC({})", codec));
        }
        Ok(definition)
    }

    pub(super) fn add_column(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &ColumnDescriptor,
        after: Option<&str>,
    ) -> Result<Vec<SqlStatement>> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN{} {}",
            self.qualified(schema, table),
            self.if_not_exists(),
            self.column_definition(column)?
        );
        if let Some(after) = after.filter(|a| !a.is_empty()) {
            sql.push_str(&format!(" AFTER {}", quote_identifier(after)));
        }
        Ok(vec![SqlStatement::new(sql, self.display_name(schema, table))])
    }

    pub(super) fn drop_column(&self, schema: Option<&str>, table: &str, column: &str) -> Vec<SqlStatement> {
        vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} DROP COLUMN{} {}",
                self.qualified(schema, table),
                self.if_exists(),
                quote_identifier(column)
            ),
            self.display_name(schema, table),
        )]
    }

    pub(super) fn alter_column(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &ColumnDescriptor,
    ) -> Result<Vec<SqlStatement>> {
        Ok(vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} MODIFY COLUMN{} {}",
                self.qualified(schema, table),
                self.if_exists(),
                self.column_definition(column)?
            ),
            self.display_name(schema, table),
        )])
    }

    pub(super) fn rename_column(
        &self,
        schema: Option<&str>,
        table: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<SqlStatement>> {
        if from.is_empty() || to.is_empty() {
            return Err(MappingError::configuration_with_context(
                "column rename needs both the old and the new name",
                format!("In ALTER TABLE \"{}\"", table),
            ));
        }
        Ok(vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} RENAME COLUMN{} {} TO {}",
                self.qualified(schema, table),
                self.if_exists(),
                quote_identifier(from),
                quote_identifier(to)
            ),
            self.display_name(schema, table),
        )])
    }
}
