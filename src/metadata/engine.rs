//! ClickHouse table engines
//!
//! Resolves the engine a table is created with from its annotations and
//! renders the `ENGINE = ...` clause. Engines outside the MergeTree family
//! take no sorting clauses at all; asking for one is a modeling error.

use log::debug;

use crate::errors::{MappingError, Result};
use crate::sql_formatter::{identifier_or_expression, quote_identifier, quote_string, StringEscape};

use super::annotations::{self, Annotations};

/// Database argument of a `Distributed` engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseToken {
    /// Rendered as a quoted literal: `'analytics'`
    Literal(String),
    /// Rendered verbatim: `currentDatabase()`
    FunctionCall(String),
}

impl DatabaseToken {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.ends_with(')') && raw.contains('(') {
            DatabaseToken::FunctionCall(raw.to_string())
        } else {
            DatabaseToken::Literal(raw.to_string())
        }
    }

    fn render(&self) -> String {
        match self {
            DatabaseToken::Literal(name) => quote_string(name, StringEscape::QuoteDoubling),
            DatabaseToken::FunctionCall(call) => call.clone(),
        }
    }
}

/// Represents the ClickHouse table engines a model can declare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEngine {
    /// Plain append-only MergeTree
    MergeTree,

    /// ReplacingMergeTree - deduplicates rows with same sorting key
    ReplacingMergeTree {
        version_column: Option<String>,
        is_deleted_column: Option<String>,
    },

    /// CollapsingMergeTree - collapses rows using sign column (-1/+1)
    CollapsingMergeTree { sign_column: String },

    /// VersionedCollapsingMergeTree - like Collapsing but with version ordering
    VersionedCollapsingMergeTree {
        sign_column: String,
        version_column: String,
    },

    /// AggregatingMergeTree - finalizes pre-aggregated state
    AggregatingMergeTree,

    /// SummingMergeTree - sums numeric columns
    SummingMergeTree { sum_columns: Vec<String> },

    /// Null - discards everything written to it (materialized-view feeder)
    Null,

    /// Memory - unsorted in-memory storage
    Memory,

    /// Distributed - routes reads and writes to a table on every shard
    Distributed {
        cluster: String,
        database: DatabaseToken,
        table: String,
        sharding_key: Option<String>,
        policy: Option<String>,
    },
}

impl TableEngine {
    /// Resolve the engine from table annotations. No engine annotation means MergeTree.
    pub fn from_annotations(ann: &Annotations) -> Result<Self> {
        let Some(name) = ann.get(annotations::ENGINE) else {
            return Ok(TableEngine::MergeTree);
        };
        debug!("Resolving engine '{}'", name);

        // Tolerate `ReplacingMergeTree()` as well as `ReplacingMergeTree`
        let name = name.strip_suffix("()").unwrap_or(name);

        match name {
            "MergeTree" => Ok(TableEngine::MergeTree),
            "ReplacingMergeTree" => {
                let version_column = ann.get(annotations::VERSION_COLUMN).map(str::to_string);
                let is_deleted_column = ann.get(annotations::IS_DELETED_COLUMN).map(str::to_string);
                if is_deleted_column.is_some() && version_column.is_none() {
                    return Err(MappingError::configuration(
                        "ReplacingMergeTree is-deleted column requires a version column",
                    ));
                }
                Ok(TableEngine::ReplacingMergeTree {
                    version_column,
                    is_deleted_column,
                })
            }
            "CollapsingMergeTree" => Ok(TableEngine::CollapsingMergeTree {
                sign_column: required(ann, annotations::SIGN_COLUMN, name)?,
            }),
            "VersionedCollapsingMergeTree" => Ok(TableEngine::VersionedCollapsingMergeTree {
                sign_column: required(ann, annotations::SIGN_COLUMN, name)?,
                version_column: required(ann, annotations::VERSION_COLUMN, name)?,
            }),
            "AggregatingMergeTree" => Ok(TableEngine::AggregatingMergeTree),
            "SummingMergeTree" => Ok(TableEngine::SummingMergeTree {
                sum_columns: ann.get_list(annotations::SUM_COLUMNS),
            }),
            "Null" => Ok(TableEngine::Null),
            "Memory" => Ok(TableEngine::Memory),
            "Distributed" => {
                let sharding_key = ann.get(annotations::DISTRIBUTED_SHARDING_KEY).map(str::to_string);
                let policy = ann.get(annotations::DISTRIBUTED_POLICY).map(str::to_string);
                if policy.is_some() && sharding_key.is_none() {
                    return Err(MappingError::configuration(
                        "Distributed storage policy requires a sharding key",
                    ));
                }
                Ok(TableEngine::Distributed {
                    cluster: required(ann, annotations::DISTRIBUTED_CLUSTER, name)?,
                    database: DatabaseToken::parse(
                        ann.get(annotations::DISTRIBUTED_DATABASE)
                            .unwrap_or("currentDatabase()"),
                    ),
                    table: required(ann, annotations::DISTRIBUTED_TABLE, name)?,
                    sharding_key,
                    policy,
                })
            }
            other => Err(MappingError::configuration(format!(
                "unknown table engine '{}'",
                other
            ))),
        }
    }

    /// Get engine name for logging/debugging
    pub fn name(&self) -> &str {
        match self {
            TableEngine::MergeTree => "MergeTree",
            TableEngine::ReplacingMergeTree { .. } => "ReplacingMergeTree",
            TableEngine::CollapsingMergeTree { .. } => "CollapsingMergeTree",
            TableEngine::VersionedCollapsingMergeTree { .. } => "VersionedCollapsingMergeTree",
            TableEngine::AggregatingMergeTree => "AggregatingMergeTree",
            TableEngine::SummingMergeTree { .. } => "SummingMergeTree",
            TableEngine::Null => "Null",
            TableEngine::Memory => "Memory",
            TableEngine::Distributed { .. } => "Distributed",
        }
    }

    /// Whether ORDER BY / PARTITION BY / PRIMARY KEY / SAMPLE BY / TTL apply.
    ///
    /// Decided by engine kind alone, never by which annotations are present.
    pub fn accepts_sorting_clauses(&self) -> bool {
        !matches!(
            self,
            TableEngine::Null | TableEngine::Memory | TableEngine::Distributed { .. }
        )
    }

    /// `ENGINE = ...` value, arguments included
    pub fn render(&self) -> String {
        match self {
            TableEngine::MergeTree => "MergeTree()".to_string(),
            TableEngine::ReplacingMergeTree {
                version_column,
                is_deleted_column,
            } => {
                let args: Vec<String> = version_column
                    .iter()
                    .chain(is_deleted_column.iter())
                    .map(|c| quote_identifier(c))
                    .collect();
                format!("ReplacingMergeTree({})", args.join(", "))
            }
            TableEngine::CollapsingMergeTree { sign_column } => {
                format!("CollapsingMergeTree({})", quote_identifier(sign_column))
            }
            TableEngine::VersionedCollapsingMergeTree {
                sign_column,
                version_column,
            } => format!(
                "VersionedCollapsingMergeTree({}, {})",
                quote_identifier(sign_column),
                quote_identifier(version_column)
            ),
            TableEngine::AggregatingMergeTree => "AggregatingMergeTree()".to_string(),
            TableEngine::SummingMergeTree { sum_columns } => {
                if sum_columns.is_empty() {
                    "SummingMergeTree()".to_string()
                } else {
                    let cols: Vec<String> =
                        sum_columns.iter().map(|c| identifier_or_expression(c)).collect();
                    format!("SummingMergeTree(({}))", cols.join(", "))
                }
            }
            TableEngine::Null => "Null".to_string(),
            TableEngine::Memory => "Memory".to_string(),
            TableEngine::Distributed {
                cluster,
                database,
                table,
                sharding_key,
                policy,
            } => {
                let mut args = vec![
                    quote_string(cluster, StringEscape::QuoteDoubling),
                    database.render(),
                    quote_string(table, StringEscape::QuoteDoubling),
                ];
                if let Some(key) = sharding_key {
                    args.push(key.clone());
                }
                if let Some(policy) = policy {
                    args.push(quote_string(policy, StringEscape::QuoteDoubling));
                }
                format!("Distributed({})", args.join(", "))
            }
        }
    }
}

fn required(ann: &Annotations, key: &str, engine: &str) -> Result<String> {
    ann.get(key).map(str::to_string).ok_or_else(|| {
        MappingError::configuration(format!("{} engine requires annotation '{}'", engine, key))
    })
}
