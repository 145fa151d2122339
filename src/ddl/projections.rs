//! Projection add / drop / materialize

use crate::errors::{MappingError, Result};
use crate::sql_formatter::quote_identifier;
use crate::statement::SqlStatement;

use super::operations::ProjectionDescriptor;
use super::DdlBuilder;

impl DdlBuilder {
    pub(super) fn add_projection(
        &self,
        schema: Option<&str>,
        table: &str,
        projection: &ProjectionDescriptor,
    ) -> Result<Vec<SqlStatement>> {
        let query = projection.query.trim();
        if query.is_empty() {
            return Err(MappingError::configuration_with_context(
                "projection has no SELECT",
                format!("In ADD PROJECTION \"{}\" on \"{}\"", projection.name, table),
            ));
        }

        let mut statements = vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} ADD PROJECTION{} {} ({})",
                self.qualified(schema, table),
                self.if_not_exists(),
                quote_identifier(&projection.name),
                query
            ),
            self.display_name(schema, table),
        )];
        if projection.materialize {
            statements.extend(self.materialize_projection(schema, table, &projection.name));
        }
        Ok(statements)
    }

    pub(super) fn drop_projection(&self, schema: Option<&str>, table: &str, name: &str) -> Vec<SqlStatement> {
        vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} DROP PROJECTION{} {}",
                self.qualified(schema, table),
                self.if_exists(),
                quote_identifier(name)
            ),
            self.display_name(schema, table),
        )]
    }

    pub(super) fn materialize_projection(
        &self,
        schema: Option<&str>,
        table: &str,
        name: &str,
    ) -> Vec<SqlStatement> {
        vec![SqlStatement::new(
            format!(
                "ALTER TABLE {} MATERIALIZE PROJECTION {}",
                self.qualified(schema, table),
                quote_identifier(name)
            ),
            self.display_name(schema, table),
        )]
    }
}
