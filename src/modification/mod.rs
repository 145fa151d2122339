//! Bulk modification batches
//!
//! Tracked row changes become INSERT and DELETE statements. Inserts are
//! grouped per destination table, deletes stay one statement per row.
//! Row-level UPDATE has no counterpart in the dialect and is rejected.

mod delete;
mod insert;

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::config::ProviderConfig;
use crate::errors::{MappingError, Result};
use crate::metadata::{ColumnDescriptor, TableMetadata};
use crate::sql_formatter::SqlValue;
use crate::statement::SqlStatement;

pub use delete::{build_delete, DeleteStrategy};
pub use insert::{build_insert, InsertFormat, InsertOptions};

pub const DEFAULT_MAX_ROWS_PER_INSERT: usize = 10_000;

/// Values of one row, keyed by property name (or resolved column name)
pub type RowValues = BTreeMap<String, SqlValue>;

/// Property name first, resolved column name second
pub(crate) fn lookup<'a>(row: &'a RowValues, column: &ColumnDescriptor) -> Option<&'a SqlValue> {
    row.get(&column.property)
        .or_else(|| row.get(&column.resolved_name()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    Insert,
    Delete,
    Update,
}

/// One tracked row change
#[derive(Debug, Clone)]
pub struct ModificationCommand {
    pub kind: ModificationKind,
    pub table: Arc<TableMetadata>,
    /// All values for inserts, key values for deletes
    pub values: RowValues,
}

impl ModificationCommand {
    pub fn insert(table: Arc<TableMetadata>, values: RowValues) -> Self {
        Self {
            kind: ModificationKind::Insert,
            table,
            values,
        }
    }

    pub fn delete(table: Arc<TableMetadata>, keys: RowValues) -> Self {
        Self {
            kind: ModificationKind::Delete,
            table,
            values: keys,
        }
    }

    pub fn update(table: Arc<TableMetadata>, values: RowValues) -> Self {
        Self {
            kind: ModificationKind::Update,
            table,
            values,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModificationBatchBuilder {
    delete_strategy: DeleteStrategy,
    insert_format: InsertFormat,
    max_rows_per_insert: usize,
    default_database: Option<String>,
}

impl Default for ModificationBatchBuilder {
    fn default() -> Self {
        Self {
            delete_strategy: DeleteStrategy::Lightweight,
            insert_format: InsertFormat::Values,
            max_rows_per_insert: DEFAULT_MAX_ROWS_PER_INSERT,
            default_database: None,
        }
    }
}

impl ModificationBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            delete_strategy: config.delete_strategy,
            insert_format: config.insert_format,
            max_rows_per_insert: config.max_rows_per_insert,
            default_database: config.default_database.clone(),
        }
    }

    pub fn with_delete_strategy(mut self, strategy: DeleteStrategy) -> Self {
        self.delete_strategy = strategy;
        self
    }

    pub fn with_insert_format(mut self, format: InsertFormat) -> Self {
        self.insert_format = format;
        self
    }

    pub fn with_max_rows_per_insert(mut self, max_rows: usize) -> Self {
        self.max_rows_per_insert = max_rows;
        self
    }

    pub fn with_default_database(mut self, database: Option<String>) -> Self {
        self.default_database = database;
        self
    }

    pub fn delete_strategy(&self) -> DeleteStrategy {
        self.delete_strategy
    }

    fn insert_options(&self) -> InsertOptions<'_> {
        InsertOptions {
            format: self.insert_format,
            max_rows: self.max_rows_per_insert,
            default_database: self.default_database.as_deref(),
        }
    }

    pub fn build_insert(&self, table: &TableMetadata, rows: &[RowValues]) -> Result<Vec<SqlStatement>> {
        build_insert(table, rows, &self.insert_options())
    }

    pub fn build_delete(&self, table: &TableMetadata, keys: &RowValues) -> Result<SqlStatement> {
        build_delete(table, keys, self.delete_strategy, self.default_database.as_deref())
    }

    /// Build every statement for a batch of commands.
    ///
    /// Inserts for one (schema, table) are merged and emitted at the position
    /// of that table's first insert. An UPDATE anywhere in the batch fails the
    /// whole batch before any statement is produced.
    pub fn build(&self, commands: &[ModificationCommand]) -> Result<Vec<SqlStatement>> {
        if let Some(update) = commands.iter().find(|c| c.kind == ModificationKind::Update) {
            return Err(MappingError::unsupported_operation(format!(
                "UPDATE of tracked rows in \"{}\" is not supported, use a bulk update path",
                update.table.name
            )));
        }

        enum Slot<'a> {
            Insert(&'a TableMetadata, Vec<RowValues>),
            Delete(&'a ModificationCommand),
        }

        let mut slots: Vec<Slot<'_>> = Vec::new();
        let mut insert_slot: BTreeMap<(Option<&str>, &str), usize> = BTreeMap::new();
        for command in commands {
            match command.kind {
                ModificationKind::Insert => {
                    let key = (command.table.schema.as_deref(), command.table.name.as_str());
                    match insert_slot.get(&key) {
                        Some(&i) => {
                            if let Slot::Insert(_, rows) = &mut slots[i] {
                                rows.push(command.values.clone());
                            }
                        }
                        None => {
                            insert_slot.insert(key, slots.len());
                            slots.push(Slot::Insert(command.table.as_ref(), vec![command.values.clone()]));
                        }
                    }
                }
                ModificationKind::Delete => slots.push(Slot::Delete(command)),
                ModificationKind::Update => {}
            }
        }

        let mut statements = Vec::new();
        for slot in slots {
            match slot {
                Slot::Insert(table, rows) => {
                    debug!("Inserting {} rows into {}", rows.len(), table.display_name());
                    statements.extend(self.build_insert(table, &rows)?);
                }
                Slot::Delete(command) => {
                    statements.push(self.build_delete(&command.table, &command.values)?);
                }
            }
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ColumnDescriptor, NestedField};
    use crate::type_mapping::ClrType;
    use uuid::Uuid;

    fn table(name: &str) -> Arc<TableMetadata> {
        Arc::new(
            TableMetadata::new(name)
                .with_column(ColumnDescriptor::new("Id", ClrType::Int64))
                .with_key("id"),
        )
    }

    fn id(value: i64) -> RowValues {
        [("Id".to_string(), SqlValue::Int(value))].into_iter().collect()
    }

    #[test]
    fn test_inserts_grouped_by_table_in_first_appearance_order() {
        let a = table("a");
        let b = table("b");
        let commands = vec![
            ModificationCommand::insert(b.clone(), id(1)),
            ModificationCommand::insert(a.clone(), id(2)),
            ModificationCommand::delete(a.clone(), id(9)),
            ModificationCommand::insert(b.clone(), id(3)),
        ];
        let stmts = ModificationBatchBuilder::new().build(&commands).unwrap();
        let sql: Vec<&str> = stmts.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "INSERT INTO \"b\" (\"id\") VALUES (1), (3)",
                "INSERT INTO \"a\" (\"id\") VALUES (2)",
                "DELETE FROM \"a\" WHERE \"id\" = 9",
            ]
        );
    }

    #[test]
    fn test_update_is_rejected_before_any_sql() {
        let t = table("t");
        let commands = vec![
            ModificationCommand::insert(t.clone(), id(1)),
            ModificationCommand::update(t, id(1)),
        ];
        let err = ModificationBatchBuilder::new().build(&commands).unwrap_err();
        assert!(
            matches!(err, MappingError::UnsupportedOperation(ref msg) if msg.contains("use a bulk update path"))
        );
    }

    #[test]
    fn test_delete_strategies() {
        let t = Arc::new(
            TableMetadata::new("T")
                .with_column(ColumnDescriptor::new("Id", ClrType::Guid).named("Id"))
                .with_key("Id"),
        );
        let guid = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
        let keys: RowValues = [("Id".to_string(), SqlValue::Uuid(guid))].into_iter().collect();

        let light = ModificationBatchBuilder::new().build_delete(&t, &keys).unwrap();
        assert_eq!(
            light.sql,
            "DELETE FROM \"T\" WHERE \"Id\" = '123e4567-e89b-12d3-a456-426614174000'"
        );
        let mutation = ModificationBatchBuilder::new()
            .with_delete_strategy(DeleteStrategy::Mutation)
            .build_delete(&t, &keys)
            .unwrap();
        assert_eq!(
            mutation.sql,
            "ALTER TABLE \"T\" DELETE WHERE \"Id\" = '123e4567-e89b-12d3-a456-426614174000'"
        );
    }

    #[test]
    fn test_nested_rows_keep_parallel_arrays_aligned() {
        let mut goals = ColumnDescriptor::new("Goals", ClrType::Other("Goal".into())).named("Goals");
        goals.nested = vec![
            NestedField::new("ID", ClrType::UInt32),
            NestedField::new("Name", ClrType::String),
        ];
        let t = Arc::new(TableMetadata::new("visits").with_column(goals));
        let element = |i: u64, name: &str| {
            SqlValue::Record(vec![("ID".into(), SqlValue::UInt(i)), ("Name".into(), SqlValue::string(name))])
        };
        let rows: Vec<RowValues> = vec![
            [("Goals".to_string(), SqlValue::Array(vec![element(1, "t1"), element(2, "t2")]))].into_iter().collect(),
            [("Goals".to_string(), SqlValue::Array(vec![element(3, "t3")]))].into_iter().collect(),
        ];
        let stmts = ModificationBatchBuilder::new().build_insert(&t, &rows).unwrap();
        assert_eq!(
            stmts[0].sql,
            "INSERT INTO \"visits\" (\"Goals.ID\", \"Goals.Name\") VALUES ([1, 2], ['t1', 't2']), ([3], ['t3'])"
        );
    }
}
