//! Migration planning and execution
//!
//! Planning is pure: operations are classified into [`Phase`]s, sorted and
//! turned into single-operation units. Execution is the only part that
//! touches a server.

mod clickhouse_executor;
mod file;
mod phase;
mod runner;
mod sorter;

pub use clickhouse_executor::{
    build_client, ClickHouseExecutor, ClickHouseUnitLog, ConnectionSettings, DEFAULT_HISTORY_TABLE,
};
pub use file::MigrationFile;
pub use phase::Phase;
pub use runner::{
    process_env, resolve_env, submit_parallel, AppliedUnitLog, EnvLookup, InMemoryUnitLog,
    MigrationRunner, RunError, RunReport, StatementExecutor,
};
pub use sorter::{coalesce_indexes, sort_operations, MigrationPlanner, MigrationUnit, PlannedUnit};
