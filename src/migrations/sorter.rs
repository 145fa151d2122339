//! Phase sorting and unit planning
//!
//! A migration's operations are bucketed by [`Phase`], buckets are
//! concatenated in ascending order, and input order is kept inside each
//! bucket. Every operation then becomes its own unit: the database has no
//! multi-statement rollback, so a unit is the granule recorded as applied.

use std::collections::HashMap;

use log::{debug, info};
use serde::Serialize;

use crate::ddl::{merge_index, DdlBuilder, SchemaOperation};
use crate::errors::Result;
use crate::statement::SqlStatement;

use super::phase::Phase;

/// One operation, positioned in the sorted migration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationUnit {
    /// 0-based position in the sorted output
    pub ordinal: usize,
    pub phase: Phase,
    pub operation: SchemaOperation,
}

impl MigrationUnit {
    /// Identifier recorded in the applied-unit log
    pub fn unit_id(&self, migration_id: &str) -> String {
        format!("{}#{:04}", migration_id, self.ordinal)
    }
}

/// A unit together with the statements that apply it
#[derive(Debug, Clone)]
pub struct PlannedUnit {
    pub unit: MigrationUnit,
    pub statements: Vec<SqlStatement>,
}

/// Stable bucket sort by phase.
pub fn sort_operations(operations: Vec<SchemaOperation>) -> Result<Vec<(Phase, SchemaOperation)>> {
    let mut buckets: Vec<Vec<SchemaOperation>> = vec![Vec::new(); Phase::ALL.len()];
    for operation in operations {
        let phase = Phase::classify(&operation)?;
        debug!("{} -> phase {}", operation, phase);
        buckets[usize::from(phase.number()) - 1].push(operation);
    }

    Ok(Phase::ALL
        .iter()
        .zip(buckets)
        .flat_map(|(phase, bucket)| bucket.into_iter().map(move |op| (*phase, op)))
        .collect())
}

/// Merge CreateIndex operations that target the same index.
///
/// The merged definition takes the position of the first occurrence.
pub fn coalesce_indexes(operations: Vec<SchemaOperation>) -> Vec<SchemaOperation> {
    let mut result: Vec<SchemaOperation> = Vec::with_capacity(operations.len());
    let mut seen: HashMap<(Option<String>, String, String), usize> = HashMap::new();

    for operation in operations {
        if let SchemaOperation::CreateIndex {
            table,
            schema,
            index,
        } = &operation
        {
            let key = (schema.clone(), table.clone(), index.name.clone());
            if let Some(&position) = seen.get(&key) {
                if let SchemaOperation::CreateIndex { index: existing, .. } = &mut result[position] {
                    debug!("Merging repeated definition of index {} on {}", index.name, table);
                    *existing = merge_index(existing, index);
                }
                continue;
            }
            seen.insert(key, result.len());
        }
        result.push(operation);
    }
    result
}

/// Turns an unordered migration into executable units.
#[derive(Debug, Clone)]
pub struct MigrationPlanner {
    builder: DdlBuilder,
}

impl MigrationPlanner {
    pub fn new(builder: DdlBuilder) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &DdlBuilder {
        &self.builder
    }

    /// Coalesce, sort and number the operations.
    pub fn plan(&self, operations: Vec<SchemaOperation>) -> Result<Vec<MigrationUnit>> {
        let sorted = sort_operations(coalesce_indexes(operations))?;
        Ok(sorted
            .into_iter()
            .enumerate()
            .map(|(ordinal, (phase, operation))| MigrationUnit {
                ordinal,
                phase,
                operation,
            })
            .collect())
    }

    /// Plan and build every unit's statements. Any build failure aborts the
    /// whole plan before a single statement is executed.
    pub fn plan_statements(&self, operations: Vec<SchemaOperation>) -> Result<Vec<PlannedUnit>> {
        let units = self.plan(operations)?;
        let planned = units
            .into_iter()
            .map(|unit| {
                let statements = self.builder.build(&unit.operation)?;
                Ok(PlannedUnit { unit, statements })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Planned {} units ({} statements)",
            planned.len(),
            planned.iter().map(|p| p.statements.len()).sum::<usize>()
        );
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::IndexDescriptor;
    use crate::metadata::{annotations, ColumnDescriptor, TableMetadata};
    use crate::type_mapping::{ClrType, TypeMappingRegistry};

    fn create_table(name: &str) -> SchemaOperation {
        SchemaOperation::CreateTable {
            table: TableMetadata::new(name).with_column(ColumnDescriptor::new("Id", ClrType::UInt64)),
        }
    }

    fn create_index(table: &str, index: IndexDescriptor) -> SchemaOperation {
        SchemaOperation::CreateIndex {
            table: table.into(),
            schema: None,
            index,
        }
    }

    #[test]
    fn test_drop_index_before_create_table_before_view() {
        let mv = SchemaOperation::CreateTable {
            table: TableMetadata::new("t1")
                .with_annotation(annotations::IS_MATERIALIZED_VIEW, "true")
                .with_annotation(annotations::MATERIALIZED_VIEW_SOURCE, "t2"),
        };
        let drop_index = SchemaOperation::DropIndex {
            table: "t1".into(),
            schema: None,
            name: "ix1".into(),
        };
        let sorted = sort_operations(vec![mv.clone(), create_table("t2"), drop_index.clone()]).unwrap();
        let phases: Vec<u8> = sorted.iter().map(|(p, _)| p.number()).collect();
        assert_eq!(phases, vec![1, 4, 6]);
        assert_eq!(sorted[0].1, drop_index);
        assert_eq!(sorted[2].1, mv);
    }

    #[test]
    fn test_sort_is_stable_within_phase() {
        let ops = vec![create_table("b"), create_table("a"), create_table("c")];
        let sorted = sort_operations(ops.clone()).unwrap();
        let sorted_ops: Vec<SchemaOperation> = sorted.into_iter().map(|(_, op)| op).collect();
        assert_eq!(sorted_ops, ops);
    }

    #[test]
    fn test_coalesce_merges_same_index() {
        let ops = vec![
            create_index("t", IndexDescriptor::new("ix", vec!["a".into()]).with_type("set")),
            create_table("t"),
            create_index("t", IndexDescriptor::new("ix", vec!["a".into()]).with_granularity(4)),
            create_index("u", IndexDescriptor::new("ix", vec!["a".into()])),
        ];
        let merged = coalesce_indexes(ops);
        assert_eq!(merged.len(), 3);
        match &merged[0] {
            SchemaOperation::CreateIndex { index, .. } => {
                assert_eq!(index.index_type.as_deref(), Some("set"));
                assert_eq!(index.granularity, Some(4));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plan_numbers_units() {
        let planner = MigrationPlanner::new(DdlBuilder::new(TypeMappingRegistry::new()));
        let units = planner
            .plan(vec![
                create_index("t", IndexDescriptor::new("ix", vec!["id".into()])),
                create_table("t"),
            ])
            .unwrap();
        assert_eq!(units[0].ordinal, 0);
        assert_eq!(units[0].phase, Phase::CreateTables);
        assert_eq!(units[1].phase, Phase::CreateIndexes);
        assert_eq!(units[1].unit_id("20260101_init"), "20260101_init#0001");
    }

    #[test]
    fn test_plan_statements_fails_before_execution() {
        let planner = MigrationPlanner::new(DdlBuilder::new(TypeMappingRegistry::new()));
        let result = planner.plan_statements(vec![
            create_table("ok"),
            SchemaOperation::CreateTable {
                table: TableMetadata::new("broken"),
            },
        ]);
        assert!(result.is_err());
    }
}
