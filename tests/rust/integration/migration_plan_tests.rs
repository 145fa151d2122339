use clickmap::config::ProviderConfig;
use clickmap::ddl::{IndexDescriptor, ProjectionDescriptor, SchemaOperation};
use clickmap::metadata::{annotations, ColumnDescriptor, TableMetadata};
use clickmap::migrations::{sort_operations, MigrationFile, MigrationPlanner, Phase};
use clickmap::type_mapping::ClrType;

fn plain(name: &str) -> SchemaOperation {
    SchemaOperation::CreateTable {
        table: TableMetadata::new(name)
            .with_column(ColumnDescriptor::new("Id", ClrType::UInt64))
            .with_annotation(annotations::ORDER_BY, "id"),
    }
}

fn materialized_view(name: &str, source: &str) -> SchemaOperation {
    SchemaOperation::CreateTable {
        table: TableMetadata::new(name)
            .with_annotation(annotations::IS_MATERIALIZED_VIEW, "true")
            .with_annotation(annotations::MATERIALIZED_VIEW_SOURCE, source),
    }
}

fn drop_index(name: &str, table: &str) -> SchemaOperation {
    SchemaOperation::DropIndex {
        table: table.into(),
        schema: None,
        name: name.into(),
    }
}

fn drop_table(name: &str) -> SchemaOperation {
    SchemaOperation::DropTable {
        name: name.into(),
        schema: None,
    }
}

#[test]
fn test_drop_index_then_source_then_view() {
    let ops = vec![
        drop_index("ix1", "t1"),
        plain("t2"),
        materialized_view("t1", "t2"),
    ];
    let sorted = sort_operations(ops.clone()).unwrap();
    let phases: Vec<u8> = sorted.iter().map(|(phase, _)| phase.number()).collect();
    assert_eq!(phases, vec![1, 4, 6]);
    let order: Vec<SchemaOperation> = sorted.into_iter().map(|(_, op)| op).collect();
    assert_eq!(order, ops);
}

#[test]
fn test_phase_invariants_hold_for_any_input_order() {
    let ops = vec![
        materialized_view("mv", "src"),
        drop_table("old"),
        SchemaOperation::CreateIndex {
            table: "src".into(),
            schema: None,
            index: IndexDescriptor::new("ix_id", vec!["id".into()]),
        },
        plain("src"),
        drop_index("ix_old", "old"),
        SchemaOperation::AddProjection {
            table: "src".into(),
            schema: None,
            projection: ProjectionDescriptor {
                name: "by_id".into(),
                query: "SELECT * ORDER BY id".into(),
                materialize: true,
            },
        },
    ];

    // every rotation of the input sorts to the same phase sequence
    for shift in 0..ops.len() {
        let mut rotated = ops.clone();
        rotated.rotate_left(shift);
        let sorted = sort_operations(rotated).unwrap();
        let phase_of = |pred: &dyn Fn(&SchemaOperation) -> bool| {
            sorted.iter().find(|(_, op)| pred(op)).map(|(p, _)| *p).unwrap()
        };
        let drop_ix = phase_of(&|op| matches!(op, SchemaOperation::DropIndex { .. }));
        let drop_tbl = phase_of(&|op| matches!(op, SchemaOperation::DropTable { .. }));
        let create_src = phase_of(&|op| op == &plain("src"));
        let create_mv = phase_of(&|op| op == &materialized_view("mv", "src"));
        assert!(drop_ix < drop_tbl);
        assert!(create_src < create_mv);
        assert!(sorted.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}

#[test]
fn test_same_phase_keeps_input_order() {
    let ops = vec![plain("c"), drop_table("x"), plain("a"), plain("b")];
    let sorted = sort_operations(ops).unwrap();
    let creates: Vec<String> = sorted
        .iter()
        .filter(|(phase, _)| *phase == Phase::CreateTables)
        .map(|(_, op)| op.target().1.to_string())
        .collect();
    assert_eq!(creates, vec!["c", "a", "b"]);
}

#[test]
fn test_planned_statements_from_yaml_document() {
    let migration = MigrationFile::from_yaml_str(
        r#"
id: 20261016_events
operations:
  - op: create_index
    table: events
    index: { name: ix_user, columns: [user_id], index_type: bloom_filter, granularity: 4 }
  - op: create_table
    table:
      name: events
      columns:
        - { property: Id, clr_type: u_int64 }
        - { property: UserId, clr_type: guid }
      annotations:
        "ClickHouse:OrderBy": id
"#,
    )
    .unwrap();

    let config = ProviderConfig {
        default_database: Some("analytics".into()),
        ..Default::default()
    };
    let planner = MigrationPlanner::new(config.ddl_builder());
    let units = planner.plan_statements(migration.operations).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].unit.unit_id(&migration.id), "20261016_events#0000");
    assert_eq!(
        units[0].statements[0].sql,
        "CREATE TABLE IF NOT EXISTS \"analytics\".\"events\" (\"id\" UInt64, \"user_id\" UUID) \
         ENGINE = MergeTree() ORDER BY (\"id\")"
    );
    assert_eq!(
        units[1].statements[0].sql,
        "ALTER TABLE \"analytics\".\"events\" ADD INDEX IF NOT EXISTS \"ix_user\" (\"user_id\") \
         TYPE bloom_filter GRANULARITY 4"
    );
    assert_eq!(units[1].statements[0].table.as_deref(), Some("analytics.events"));
}
