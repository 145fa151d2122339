//! Migration phases
//!
//! Fixed, totally ordered buckets. Dependents are dropped before their
//! sources and sources are created before their dependents.

use std::fmt;

use serde::Serialize;

use crate::ddl::SchemaOperation;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Phase {
    DropProjectionsAndIndexes = 1,
    DropViewsAndDictionaries = 2,
    DropTables = 3,
    CreateTables = 4,
    AddColumns = 5,
    CreateViewsAndDictionaries = 6,
    ChangeColumns = 7,
    CreateIndexes = 8,
    AddProjections = 9,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::DropProjectionsAndIndexes,
        Phase::DropViewsAndDictionaries,
        Phase::DropTables,
        Phase::CreateTables,
        Phase::AddColumns,
        Phase::CreateViewsAndDictionaries,
        Phase::ChangeColumns,
        Phase::CreateIndexes,
        Phase::AddProjections,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Assign an operation to its phase.
    ///
    /// A CreateTable lands in phase 6 when its annotations flag it as a
    /// materialized view or dictionary. A DropTable always lands in phase 3:
    /// once dropped from the model, a table's kind is no longer known.
    pub fn classify(operation: &SchemaOperation) -> Result<Phase> {
        Ok(match operation {
            SchemaOperation::DropIndex { .. } | SchemaOperation::DropProjection { .. } => {
                Phase::DropProjectionsAndIndexes
            }
            SchemaOperation::DropMaterializedView { .. }
            | SchemaOperation::DropDictionary { .. }
            | SchemaOperation::DropView { .. } => Phase::DropViewsAndDictionaries,
            SchemaOperation::DropTable { .. } => Phase::DropTables,
            SchemaOperation::CreateTable { table } => {
                if table.is_materialized_view()? || table.is_dictionary()? {
                    Phase::CreateViewsAndDictionaries
                } else {
                    Phase::CreateTables
                }
            }
            SchemaOperation::AddColumn { .. } => Phase::AddColumns,
            SchemaOperation::CreateMaterializedView { .. }
            | SchemaOperation::CreateDictionary { .. }
            | SchemaOperation::CreateView { .. } => Phase::CreateViewsAndDictionaries,
            SchemaOperation::AlterColumn { .. }
            | SchemaOperation::DropColumn { .. }
            | SchemaOperation::RenameColumn { .. } => Phase::ChangeColumns,
            SchemaOperation::CreateIndex { .. } => Phase::CreateIndexes,
            SchemaOperation::AddProjection { .. } | SchemaOperation::MaterializeProjection { .. } => {
                Phase::AddProjections
            }
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::DropProjectionsAndIndexes => "drop projections and indexes",
            Phase::DropViewsAndDictionaries => "drop materialized views and dictionaries",
            Phase::DropTables => "drop tables",
            Phase::CreateTables => "create tables",
            Phase::AddColumns => "add columns",
            Phase::CreateViewsAndDictionaries => "create materialized views and dictionaries",
            Phase::ChangeColumns => "modify, drop and rename columns",
            Phase::CreateIndexes => "create indexes",
            Phase::AddProjections => "add and materialize projections",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.description())
    }
}
