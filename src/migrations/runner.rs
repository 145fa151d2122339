//! Migration execution
//!
//! Units run strictly one after another, and each unit's statements run in
//! order. A unit is recorded as applied only after all of its statements
//! succeed, so a re-run after a failure resumes at the failed unit.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::errors::MappingError;
use crate::statement::SqlStatement;

use super::sorter::{MigrationUnit, PlannedUnit};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Environment variable '{name}' required by a statement on {table} is not set")]
    MissingEnvironment { name: String, table: String },

    #[error("ClickHouse error: {0}")]
    Clickhouse(#[from] clickhouse::error::Error),

    #[error("Statement failed: {0}")]
    Execution(String),

    #[error("Unit {unit_id} failed: {source}")]
    UnitFailed {
        unit_id: String,
        #[source]
        source: Box<RunError>,
    },
}

/// Looks up an environment variable by name
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<(), RunError>;
}

#[async_trait]
impl<T: StatementExecutor + ?Sized> StatementExecutor for Arc<T> {
    async fn execute(&self, sql: &str) -> Result<(), RunError> {
        (**self).execute(sql).await
    }
}

/// Persistent record of applied units
#[async_trait]
pub trait AppliedUnitLog: Send + Sync {
    /// Create the backing storage if needed
    async fn ensure(&self) -> Result<(), RunError> {
        Ok(())
    }

    async fn applied(&self, migration_id: &str) -> Result<HashSet<String>, RunError>;

    async fn record(&self, migration_id: &str, unit: &MigrationUnit) -> Result<(), RunError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUnitLog {
    applied: Mutex<HashSet<String>>,
}

impl InMemoryUnitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.applied.lock().await.len()
    }
}

#[async_trait]
impl AppliedUnitLog for InMemoryUnitLog {
    async fn applied(&self, migration_id: &str) -> Result<HashSet<String>, RunError> {
        let prefix = format!("{}#", migration_id);
        Ok(self
            .applied
            .lock()
            .await
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn record(&self, migration_id: &str, unit: &MigrationUnit) -> Result<(), RunError> {
        self.applied.lock().await.insert(unit.unit_id(migration_id));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct MigrationRunner<E, L> {
    executor: E,
    log: L,
    env: EnvLookup,
}

impl<E: StatementExecutor, L: AppliedUnitLog> MigrationRunner<E, L> {
    pub fn new(executor: E, log: L) -> Self {
        Self {
            executor,
            log,
            env: process_env(),
        }
    }

    pub fn with_env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub async fn run(&self, migration_id: &str, units: &[PlannedUnit]) -> Result<RunReport, RunError> {
        self.log.ensure().await?;
        let applied = self.log.applied(migration_id).await?;
        let mut report = RunReport::default();

        for planned in units {
            let unit_id = planned.unit.unit_id(migration_id);
            if applied.contains(&unit_id) {
                debug!("Skipping applied unit {} ({})", unit_id, planned.unit.operation);
                report.skipped.push(unit_id);
                continue;
            }

            info!(
                "Applying unit {} in phase {}: {}",
                unit_id, planned.unit.phase, planned.unit.operation
            );
            for statement in &planned.statements {
                let sql = resolve_env(statement, &self.env)?;
                info!(
                    "Executing statement on {}",
                    statement.table.as_deref().unwrap_or("-")
                );
                // unresolved text only, placeholders may stand for secrets
                debug!("{}", statement.sql);
                if let Err(e) = self.executor.execute(&sql).await {
                    warn!("Unit {} failed, it will be retried on the next run", unit_id);
                    return Err(RunError::UnitFailed {
                        unit_id,
                        source: Box::new(e),
                    });
                }
            }
            self.log.record(migration_id, &planned.unit).await?;
            report.applied.push(unit_id);
        }

        info!(
            "Migration {}: {} units applied, {} already applied",
            migration_id,
            report.applied.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Substitute the statement's env placeholders
pub fn resolve_env(statement: &SqlStatement, env: &EnvLookup) -> Result<String, RunError> {
    statement
        .resolve(|name: &str| env(name))
        .map_err(|name| RunError::MissingEnvironment {
            name,
            table: statement.table.clone().unwrap_or_else(|| "-".to_string()),
        })
}

/// Run independent statements (insert chunks) with at most `parallelism`
/// in flight. Returns the number of statements executed.
pub async fn submit_parallel<E>(
    executor: &E,
    statements: &[SqlStatement],
    parallelism: usize,
    env: &EnvLookup,
) -> Result<usize, RunError>
where
    E: StatementExecutor + ?Sized,
{
    let resolved = statements
        .iter()
        .map(|statement| resolve_env(statement, env))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Submitting {} statements with parallelism {}",
        resolved.len(),
        parallelism.max(1)
    );
    let results: Vec<Result<(), RunError>> = stream::iter(resolved.iter())
        .map(|sql| executor.execute(sql))
        .buffer_unordered(parallelism.max(1))
        .collect()
        .await;

    results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(resolved.len())
}
