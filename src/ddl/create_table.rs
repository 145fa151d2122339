//! CREATE TABLE and the engine-dependent sorting clauses
//
// CREATE TABLE IF NOT EXISTS "analytics"."hits"
// (
//     "id" UInt64,
//     "ts" DateTime64(3)
// )
// ENGINE = ReplacingMergeTree("ver")
// ORDER BY ("id") PARTITION BY toYYYYMM(ts) TTL ts + INTERVAL 30 DAY

use log::debug;

use crate::errors::{MappingError, Result};
use crate::metadata::{annotations, Annotations, TableEngine, TableMetadata};
use crate::sql_formatter::{identifier_or_expression, quote_string, StringEscape};
use crate::statement::SqlStatement;

use super::DdlBuilder;

const SORTING_CLAUSES: [(&str, &str); 5] = [
    (annotations::ORDER_BY, "ORDER BY"),
    (annotations::PARTITION_BY, "PARTITION BY"),
    (annotations::PRIMARY_KEY, "PRIMARY KEY"),
    (annotations::TTL, "TTL"),
    (annotations::SAMPLE_BY, "SAMPLE BY"),
];

impl DdlBuilder {
    pub(super) fn create_table(&self, table: &TableMetadata) -> Result<Vec<SqlStatement>> {
        let context = format!("In CREATE TABLE \"{}\"", table.name);
        if table.columns.is_empty() {
            return Err(MappingError::configuration_with_context(
                "table has no columns",
                context,
            ));
        }

        let engine = table.engine()?;
        debug!("Table {} uses engine {}", table.display_name(), engine.name());

        let columns = table
            .columns
            .iter()
            .map(|column| self.column_definition(column))
            .collect::<Result<Vec<_>>>()?;

        let mut sql = format!(
            "CREATE TABLE{} {} ({}) ENGINE = {}",
            self.if_not_exists(),
            self.qualified(table.schema.as_deref(), &table.name),
            columns.join(", "),
            engine.render()
        );
        sql.push_str(&sorting_clauses(&engine, &table.annotations, &context)?);
        sql.push_str(&table_options(&table.annotations));

        Ok(vec![SqlStatement::new(
            sql,
            self.display_name(table.schema.as_deref(), &table.name),
        )])
    }
}

/// ` ORDER BY (...) PARTITION BY ... PRIMARY KEY (...) TTL ... SAMPLE BY ...`
///
/// Engines outside the MergeTree family take none of these; declaring one
/// for them is a configuration error rather than a silently dropped clause.
pub(super) fn sorting_clauses(engine: &TableEngine, ann: &Annotations, context: &str) -> Result<String> {
    if !engine.accepts_sorting_clauses() {
        let declared: Vec<&str> = SORTING_CLAUSES
            .iter()
            .filter(|(key, _)| ann.contains(key))
            .map(|(_, clause)| *clause)
            .collect();
        if !declared.is_empty() {
            return Err(MappingError::configuration_with_context(
                format!(
                    "{} engine does not accept {}",
                    engine.name(),
                    declared.join(", ")
                ),
                context,
            ));
        }
        return Ok(String::new());
    }

    let order_by = ann.get_list(annotations::ORDER_BY);
    let primary_key = ann.get_list(annotations::PRIMARY_KEY);
    if !primary_key.is_empty() && !order_by.starts_with(&primary_key) {
        return Err(MappingError::configuration_with_context(
            "PRIMARY KEY must be a prefix of ORDER BY",
            context,
        ));
    }

    let mut clauses = String::new();
    if order_by.is_empty() || order_by == ["tuple()"] {
        clauses.push_str(" ORDER BY tuple()");
    } else {
        clauses.push_str(&format!(" ORDER BY ({})", render_list(&order_by)));
    }
    if let Some(partition) = ann.get(annotations::PARTITION_BY) {
        clauses.push_str(&format!(" PARTITION BY {}", identifier_or_expression(partition)));
    }
    if !primary_key.is_empty() {
        clauses.push_str(&format!(" PRIMARY KEY ({})", render_list(&primary_key)));
    }
    if let Some(ttl) = ann.get(annotations::TTL) {
        clauses.push_str(&format!(" TTL {}", ttl));
    }
    if let Some(sample) = ann.get(annotations::SAMPLE_BY) {
        clauses.push_str(&format!(" SAMPLE BY {}", identifier_or_expression(sample)));
    }
    Ok(clauses)
}

/// ` SETTINGS ... COMMENT '...'`
pub(super) fn table_options(ann: &Annotations) -> String {
    let mut options = String::new();
    if let Some(settings) = ann.get(annotations::SETTINGS) {
        options.push_str(&format!(" SETTINGS {}", settings));
    }
    if let Some(comment) = ann.get(annotations::COMMENT) {
        options.push_str(&format!(
            " COMMENT {}",
            quote_string(comment, StringEscape::QuoteDoubling)
        ));
    }
    options
}

fn render_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| identifier_or_expression(item))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::ddl::{DdlBuilder, SchemaOperation};
    use crate::errors::MappingError;
    use crate::metadata::{annotations, ColumnDescriptor, TableMetadata};
    use crate::type_mapping::{ClrType, TypeMappingRegistry};

    fn hits() -> TableMetadata {
        TableMetadata::new("hits")
            .with_schema("analytics")
            .with_column(ColumnDescriptor::new("Id", ClrType::UInt64))
            .with_column(ColumnDescriptor::new("Ts", ClrType::DateTime))
            .with_column(ColumnDescriptor::new("Ver", ClrType::UInt32))
    }

    fn build(table: TableMetadata) -> crate::errors::Result<String> {
        DdlBuilder::new(TypeMappingRegistry::new())
            .build(&SchemaOperation::CreateTable { table })
            .map(|mut stmts| stmts.remove(0).sql)
    }

    #[test]
    fn test_plain_merge_tree_defaults_to_tuple_order() {
        assert_eq!(
            build(hits()).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"analytics\".\"hits\" (\"id\" UInt64, \"ts\" DateTime64(3), \"ver\" UInt32) ENGINE = MergeTree() ORDER BY tuple()"
        );
    }

    #[test]
    fn test_replacing_engine_with_all_clauses() {
        let table = hits()
            .with_annotation(annotations::ENGINE, "ReplacingMergeTree")
            .with_annotation(annotations::VERSION_COLUMN, "ver")
            .with_annotation(annotations::ORDER_BY, "id, ts")
            .with_annotation(annotations::PRIMARY_KEY, "id")
            .with_annotation(annotations::PARTITION_BY, "toYYYYMM(ts)")
            .with_annotation(annotations::TTL, "ts + INTERVAL 30 DAY")
            .with_annotation(annotations::SAMPLE_BY, "id")
            .with_annotation(annotations::SETTINGS, "index_granularity = 8192")
            .with_annotation(annotations::COMMENT, "raw hits");
        assert_eq!(
            build(table).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"analytics\".\"hits\" (\"id\" UInt64, \"ts\" DateTime64(3), \"ver\" UInt32) \
             ENGINE = ReplacingMergeTree(\"ver\") ORDER BY (\"id\", \"ts\") PARTITION BY toYYYYMM(ts) \
             PRIMARY KEY (\"id\") TTL ts + INTERVAL 30 DAY SAMPLE BY \"id\" \
             SETTINGS index_granularity = 8192 COMMENT 'raw hits'"
        );
    }

    #[test]
    fn test_null_engine_rejects_order_by() {
        let table = hits()
            .with_annotation(annotations::ENGINE, "Null")
            .with_annotation(annotations::ORDER_BY, "id");
        let err = build(table).unwrap_err();
        assert!(matches!(err, MappingError::Configuration(ref m) if m.contains("Null engine does not accept ORDER BY")));
    }

    #[test]
    fn test_null_engine_without_sorting() {
        let table = hits().with_annotation(annotations::ENGINE, "Null");
        assert!(build(table).unwrap().ends_with("ENGINE = Null"));
    }

    #[test]
    fn test_distributed_engine_clause() {
        let table = hits()
            .with_annotation(annotations::ENGINE, "Distributed")
            .with_annotation(annotations::DISTRIBUTED_CLUSTER, "main")
            .with_annotation(annotations::DISTRIBUTED_TABLE, "hits_local")
            .with_annotation(annotations::DISTRIBUTED_SHARDING_KEY, "rand()");
        assert!(build(table)
            .unwrap()
            .ends_with("ENGINE = Distributed('main', currentDatabase(), 'hits_local', rand())"));
    }

    #[test]
    fn test_distributed_rejects_ttl() {
        let table = hits()
            .with_annotation(annotations::ENGINE, "Distributed")
            .with_annotation(annotations::DISTRIBUTED_CLUSTER, "main")
            .with_annotation(annotations::DISTRIBUTED_TABLE, "hits_local")
            .with_annotation(annotations::TTL, "ts + INTERVAL 1 DAY");
        assert!(build(table).is_err());
    }

    #[test]
    fn test_primary_key_must_prefix_order_by() {
        let table = hits()
            .with_annotation(annotations::ORDER_BY, "ts, id")
            .with_annotation(annotations::PRIMARY_KEY, "id");
        assert!(build(table).is_err());
    }

    #[test]
    fn test_table_without_columns() {
        assert!(build(TableMetadata::new("empty")).is_err());
    }

    #[test]
    fn test_unmapped_type_fails_at_build_time() {
        let table = TableMetadata::new("spans")
            .with_column(ColumnDescriptor::new("Duration", ClrType::TimeSpan));
        assert!(matches!(
            build(table).unwrap_err(),
            MappingError::UnsupportedType { .. }
        ));
    }
}
