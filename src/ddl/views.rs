//! Materialized views and parameterized views

use crate::errors::{MappingError, Result};
use crate::expression::{build_where_clause, ExpressionTranslator};
use crate::metadata::{ColumnNameMap, TableEngine, TableMetadata};
use crate::sql_formatter::quote_identifier;
use crate::statement::SqlStatement;

use super::create_table::{sorting_clauses, table_options};
use super::operations::{MaterializedViewDescriptor, ViewDescriptor};
use super::DdlBuilder;

impl DdlBuilder {
    /// `CREATE MATERIALIZED VIEW ... TO "t" AS SELECT ...`, or with an inline
    /// engine when the view stores its own rows.
    pub(super) fn create_materialized_view(
        &self,
        view: &MaterializedViewDescriptor,
    ) -> Result<Vec<SqlStatement>> {
        let schema = view.schema.as_deref();
        let context = format!("In CREATE MATERIALIZED VIEW \"{}\"", view.name);

        let query = match view.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_string(),
            Some(_) => {
                return Err(MappingError::configuration_with_context(
                    "materialized view query is empty",
                    context,
                ))
            }
            None if view.source_table.trim().is_empty() => {
                return Err(MappingError::configuration_with_context(
                    "materialized view has neither a query nor a source table",
                    context,
                ))
            }
            None => format!(
                "SELECT * FROM {}",
                self.qualified_reference(schema, &view.source_table)
            ),
        };

        let mut sql = format!(
            "CREATE MATERIALIZED VIEW{} {}",
            self.if_not_exists(),
            self.qualified(schema, &view.name)
        );

        match view.to_table.as_deref().filter(|t| !t.is_empty()) {
            Some(to_table) => {
                if view.populate {
                    return Err(MappingError::configuration_with_context(
                        "POPULATE cannot be combined with a TO table",
                        context,
                    ));
                }
                sql.push_str(&format!(" TO {}", self.qualified_reference(schema, to_table)));
            }
            None => {
                if !view.columns.is_empty() {
                    let columns = view
                        .columns
                        .iter()
                        .map(|c| self.column_definition(c))
                        .collect::<Result<Vec<_>>>()?;
                    sql.push_str(&format!(" ({})", columns.join(", ")));
                }
                let engine = TableEngine::from_annotations(&view.annotations)?;
                sql.push_str(&format!(" ENGINE = {}", engine.render()));
                sql.push_str(&sorting_clauses(&engine, &view.annotations, &context)?);
                sql.push_str(&table_options(&view.annotations));
                if view.populate {
                    sql.push_str(" POPULATE");
                }
            }
        }
        sql.push_str(&format!(" AS {}", query));

        Ok(vec![SqlStatement::new(sql, self.display_name(schema, &view.name))])
    }

    /// `CREATE VIEW "v" AS SELECT ... FROM "src" WHERE <predicate>` with
    /// `{name:Type}` placeholders bound at query time.
    pub(super) fn create_view(&self, view: &ViewDescriptor) -> Result<Vec<SqlStatement>> {
        let source = TableMetadata {
            columns: view.columns.clone(),
            ..TableMetadata::new(view.source_table.clone())
        };
        let columns = ColumnNameMap::from_table(&source);

        let select = if view.select.is_empty() {
            "*".to_string()
        } else {
            view.select
                .iter()
                .map(|property| quote_identifier(&columns.column_for(property)))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let source_schema = view.source_schema.as_deref().or(view.schema.as_deref());
        let mut sql = format!(
            "CREATE VIEW{} {} AS SELECT {} FROM {}",
            self.if_not_exists(),
            self.qualified(view.schema.as_deref(), &view.name),
            select,
            self.qualified(source_schema, &view.source_table)
        );

        if let Some(predicate) = &view.predicate {
            let translator = ExpressionTranslator::new(&columns, &self.registry);
            sql.push(' ');
            sql.push_str(&build_where_clause(predicate, &translator)?);
        }

        Ok(vec![SqlStatement::new(
            sql,
            self.display_name(view.schema.as_deref(), &view.name),
        )])
    }
}

#[cfg(test)]
mod tests {
    use crate::ddl::{DdlBuilder, MaterializedViewDescriptor, SchemaOperation, ViewDescriptor};
    use crate::expression::Expr;
    use crate::metadata::{annotations, Annotations, ColumnDescriptor, TableMetadata};
    use crate::type_mapping::{ClrType, TypeMappingRegistry};

    fn builder() -> DdlBuilder {
        DdlBuilder::new(TypeMappingRegistry::new())
    }

    fn mv() -> MaterializedViewDescriptor {
        MaterializedViewDescriptor {
            name: "daily_hits".into(),
            schema: None,
            source_table: "hits".into(),
            query: Some("SELECT toDate(ts) AS day, count() AS hits FROM hits GROUP BY day".into()),
            to_table: Some("daily_hits_store".into()),
            columns: vec![],
            annotations: Annotations::new(),
            populate: false,
        }
    }

    #[test]
    fn test_materialized_view_to_table() {
        let stmts = builder()
            .build(&SchemaOperation::CreateMaterializedView { view: mv() })
            .unwrap();
        assert_eq!(
            stmts[0].sql,
            "CREATE MATERIALIZED VIEW IF NOT EXISTS \"daily_hits\" TO \"daily_hits_store\" \
             AS SELECT toDate(ts) AS day, count() AS hits FROM hits GROUP BY day"
        );
    }

    #[test]
    fn test_materialized_view_inline_engine_and_populate() {
        let mut view = mv();
        view.to_table = None;
        view.populate = true;
        view.columns = vec![
            ColumnDescriptor::new("Day", ClrType::DateOnly),
            ColumnDescriptor::new("Hits", ClrType::UInt64),
        ];
        view.annotations = Annotations::new()
            .with(annotations::ENGINE, "SummingMergeTree")
            .with(annotations::ORDER_BY, "day");
        let stmts = builder()
            .build(&SchemaOperation::CreateMaterializedView { view })
            .unwrap();
        assert_eq!(
            stmts[0].sql,
            "CREATE MATERIALIZED VIEW IF NOT EXISTS \"daily_hits\" (\"day\" Date, \"hits\" UInt64) \
             ENGINE = SummingMergeTree() ORDER BY (\"day\") POPULATE \
             AS SELECT toDate(ts) AS day, count() AS hits FROM hits GROUP BY day"
        );
    }

    #[test]
    fn test_populate_with_to_table_rejected() {
        let mut view = mv();
        view.populate = true;
        assert!(builder()
            .build(&SchemaOperation::CreateMaterializedView { view })
            .is_err());
    }

    #[test]
    fn test_flagged_create_table_defaults_query_from_source() {
        let table = TableMetadata::new("hits_copy")
            .with_schema("analytics")
            .with_annotation(annotations::IS_MATERIALIZED_VIEW, "true")
            .with_annotation(annotations::MATERIALIZED_VIEW_SOURCE, "hits")
            .with_annotation(annotations::MATERIALIZED_VIEW_TO, "raw.hits_archive");
        let stmts = builder().build(&SchemaOperation::CreateTable { table }).unwrap();
        assert_eq!(
            stmts[0].sql,
            "CREATE MATERIALIZED VIEW IF NOT EXISTS \"analytics\".\"hits_copy\" TO \"raw\".\"hits_archive\" \
             AS SELECT * FROM \"analytics\".\"hits\""
        );
    }

    #[test]
    fn test_parameterized_view() {
        let view = ViewDescriptor {
            name: "tenant_orders".into(),
            schema: None,
            source_table: "orders".into(),
            source_schema: None,
            columns: vec![ColumnDescriptor::new("TenantId", ClrType::Guid).named("tenant")],
            select: vec!["Id".into(), "Total".into()],
            predicate: Some(Expr::eq(
                Expr::member("TenantId"),
                Expr::parameter("tenant_id", ClrType::Guid),
            )),
        };
        let stmts = builder().build(&SchemaOperation::CreateView { view }).unwrap();
        assert_eq!(
            stmts[0].sql,
            "CREATE VIEW IF NOT EXISTS \"tenant_orders\" AS SELECT \"id\", \"total\" FROM \"orders\" \
             WHERE (\"tenant\" = {tenant_id:UUID})"
        );
    }
}
