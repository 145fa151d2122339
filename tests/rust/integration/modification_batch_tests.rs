use std::sync::Arc;

use chrono::NaiveDate;
use clickmap::config::ProviderConfig;
use clickmap::errors::MappingError;
use clickmap::metadata::{ColumnDescriptor, NestedField, TableMetadata};
use clickmap::modification::{
    DeleteStrategy, InsertFormat, ModificationBatchBuilder, ModificationCommand, RowValues,
};
use clickmap::sql_formatter::SqlValue;
use clickmap::type_mapping::ClrType;
use uuid::Uuid;

fn keyed_by_guid() -> Arc<TableMetadata> {
    Arc::new(
        TableMetadata::new("T")
            .with_column(ColumnDescriptor::new("Id", ClrType::Guid).named("Id"))
            .with_column(ColumnDescriptor::new("Note", ClrType::String).nullable())
            .with_key("Id"),
    )
}

fn guid_key() -> RowValues {
    let id = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
    [("Id".to_string(), SqlValue::Uuid(id))].into_iter().collect()
}

#[test]
fn test_delete_by_guid_under_both_strategies() {
    let commands = vec![ModificationCommand::delete(keyed_by_guid(), guid_key())];

    let lightweight = ModificationBatchBuilder::new().build(&commands).unwrap();
    assert_eq!(
        lightweight[0].sql,
        "DELETE FROM \"T\" WHERE \"Id\" = '123e4567-e89b-12d3-a456-426614174000'"
    );

    let config = ProviderConfig {
        delete_strategy: DeleteStrategy::Mutation,
        ..Default::default()
    };
    let mutation = ModificationBatchBuilder::from_config(&config).build(&commands).unwrap();
    assert_eq!(
        mutation[0].sql,
        "ALTER TABLE \"T\" DELETE WHERE \"Id\" = '123e4567-e89b-12d3-a456-426614174000'"
    );
}

fn visits() -> Arc<TableMetadata> {
    let mut goals = ColumnDescriptor::new("Goals", ClrType::Other("Goal".into())).named("Goals");
    goals.nested = vec![
        NestedField::new("ID", ClrType::UInt32),
        NestedField::new("EventTime", ClrType::DateTime),
    ];
    Arc::new(
        TableMetadata::new("visits")
            .with_column(ColumnDescriptor::new("VisitId", ClrType::UInt64))
            .with_column(goals),
    )
}

fn goal(id: u64, day: u32) -> SqlValue {
    let ts = NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    SqlValue::Record(vec![
        ("ID".into(), SqlValue::UInt(id)),
        ("EventTime".into(), SqlValue::DateTime(ts)),
    ])
}

fn visit(id: u64, goals: Vec<SqlValue>) -> RowValues {
    [
        ("VisitId".to_string(), SqlValue::UInt(id)),
        ("Goals".to_string(), SqlValue::Array(goals)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_nested_column_expands_to_parallel_arrays() {
    let table = visits();
    let commands = vec![
        ModificationCommand::insert(table.clone(), visit(1, vec![goal(1, 1), goal(2, 2)])),
        ModificationCommand::insert(table, visit(2, vec![goal(3, 3)])),
    ];
    let stmts = ModificationBatchBuilder::new().build(&commands).unwrap();
    assert_eq!(stmts.len(), 1);
    assert_eq!(
        stmts[0].sql,
        "INSERT INTO \"visits\" (\"visit_id\", \"Goals.ID\", \"Goals.EventTime\") VALUES \
         (1, [1, 2], ['2024-05-01 12:00:00', '2024-05-02 12:00:00']), \
         (2, [3], ['2024-05-03 12:00:00'])"
    );
}

#[test]
fn test_nested_field_arrays_match_element_counts() {
    let table = visits();
    let sizes = [0usize, 1, 4, 2];
    let rows: Vec<RowValues> = sizes
        .iter()
        .enumerate()
        .map(|(i, &k)| visit(i as u64, (0..k).map(|j| goal(j as u64, 1 + j as u32)).collect()))
        .collect();
    let stmts = ModificationBatchBuilder::new()
        .with_insert_format(InsertFormat::JsonEachRow)
        .build_insert(&table, &rows)
        .unwrap();

    let body: Vec<&str> = stmts[0].sql.lines().skip(1).collect();
    assert_eq!(body.len(), sizes.len());
    for (line, &k) in body.iter().zip(&sizes) {
        let row: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(row["Goals.ID"].as_array().unwrap().len(), k);
        assert_eq!(row["Goals.EventTime"].as_array().unwrap().len(), k);
    }
}

#[test]
fn test_update_has_no_row_level_translation() {
    let commands = vec![ModificationCommand::update(keyed_by_guid(), guid_key())];
    let err = ModificationBatchBuilder::new().build(&commands).unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedOperation(_)));
}

#[test]
fn test_large_batch_is_chunked() {
    let table = keyed_by_guid();
    let commands: Vec<ModificationCommand> = (0..7)
        .map(|i| {
            let mut row = guid_key();
            row.insert("Note".into(), SqlValue::string(format!("n{}", i)));
            ModificationCommand::insert(table.clone(), row)
        })
        .collect();
    let stmts = ModificationBatchBuilder::new()
        .with_max_rows_per_insert(3)
        .build(&commands)
        .unwrap();
    assert_eq!(stmts.len(), 3);
    assert!(stmts.iter().all(|s| s.sql.starts_with("INSERT INTO \"T\" (\"Id\", \"note\") VALUES")));
}
