use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clickmap::ddl::{DdlBuilder, SchemaOperation};
use clickmap::metadata::{annotations, ColumnDescriptor, TableMetadata};
use clickmap::migrations::{
    submit_parallel, EnvLookup, InMemoryUnitLog, MigrationPlanner, MigrationRunner, PlannedUnit,
    RunError, StatementExecutor,
};
use clickmap::statement::SqlStatement;
use clickmap::type_mapping::{ClrType, TypeMappingRegistry};
use tokio::sync::Mutex;

/// Collects executed SQL; fails any statement containing `fail_on` while armed
struct FlakyExecutor {
    executed: Mutex<Vec<String>>,
    fail_on: String,
    armed: AtomicBool,
}

impl FlakyExecutor {
    fn new(fail_on: &str) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail_on: fail_on.to_string(),
            armed: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl StatementExecutor for FlakyExecutor {
    async fn execute(&self, sql: &str) -> Result<(), RunError> {
        if self.armed.load(Ordering::SeqCst) && sql.contains(&self.fail_on) {
            return Err(RunError::Execution(format!("injected failure on {}", self.fail_on)));
        }
        self.executed.lock().await.push(sql.to_string());
        Ok(())
    }
}

fn table(name: &str) -> SchemaOperation {
    SchemaOperation::CreateTable {
        table: TableMetadata::new(name).with_column(ColumnDescriptor::new("Id", ClrType::UInt64)),
    }
}

fn plan(ops: Vec<SchemaOperation>) -> Vec<PlannedUnit> {
    MigrationPlanner::new(DdlBuilder::new(TypeMappingRegistry::new()))
        .plan_statements(ops)
        .unwrap()
}

#[tokio::test]
async fn test_rerun_resumes_at_failed_unit() {
    let units = plan(vec![table("a"), table("b"), table("c")]);
    let executor = Arc::new(FlakyExecutor::new("\"b\""));
    let runner = MigrationRunner::new(executor.clone(), InMemoryUnitLog::new());

    let err = runner.run("m1", &units).await.unwrap_err();
    match err {
        RunError::UnitFailed { unit_id, .. } => assert_eq!(unit_id, "m1#0001"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(executor.executed.lock().await.len(), 1);

    executor.armed.store(false, Ordering::SeqCst);
    let report = runner.run("m1", &units).await.unwrap();
    assert_eq!(report.skipped, vec!["m1#0000"]);
    assert_eq!(report.applied, vec!["m1#0001", "m1#0002"]);

    let executed = executor.executed.lock().await.clone();
    assert_eq!(executed.len(), 3);
    assert!(executed[1].contains("\"b\""));

    // a third run has nothing left to do
    let report = runner.run("m1", &units).await.unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped.len(), 3);
}

#[tokio::test]
async fn test_env_placeholders_resolved_before_execution() {
    let dictionary = TableMetadata::new("countries")
        .with_column(ColumnDescriptor::new("Id", ClrType::UInt64))
        .with_key("id")
        .with_annotation(annotations::IS_DICTIONARY, "true")
        .with_annotation(
            annotations::DICTIONARY_SOURCE,
            r#"{"clickhouse": {"table": "countries_src", "password": {"env": "CH_DICT_PW"}}}"#,
        );
    let units = plan(vec![SchemaOperation::CreateTable { table: dictionary }]);
    assert_eq!(units[0].statements[0].env_bindings, vec!["CH_DICT_PW"]);

    let executor = Arc::new(FlakyExecutor::new("never"));
    let missing: EnvLookup = Arc::new(|_| None);
    let runner = MigrationRunner::new(executor.clone(), InMemoryUnitLog::new()).with_env_lookup(missing);
    let err = runner.run("m2", &units).await.unwrap_err();
    assert!(matches!(err, RunError::MissingEnvironment { ref name, .. } if name == "CH_DICT_PW"));
    assert!(executor.executed.lock().await.is_empty());

    let present: EnvLookup = Arc::new(|name| (name == "CH_DICT_PW").then(|| "pa'ss".to_string()));
    let runner = MigrationRunner::new(executor.clone(), InMemoryUnitLog::new()).with_env_lookup(present);
    runner.run("m2", &units).await.unwrap();
    let executed = executor.executed.lock().await.clone();
    assert!(executed[0].contains("PASSWORD 'pa\\'ss'"));
    assert!(!executed[0].contains("<env:"));
}

#[tokio::test]
async fn test_parallel_submission_reports_first_failure() {
    let executor = Arc::new(FlakyExecutor::new("INSERT 3"));
    let statements: Vec<SqlStatement> = (0..6)
        .map(|i| SqlStatement::new(format!("INSERT {}", i), "t"))
        .collect();
    let env: EnvLookup = Arc::new(|_| None);
    let result = submit_parallel(&executor, &statements, 4, &env).await;
    assert!(matches!(result, Err(RunError::Execution(_))));

    executor.armed.store(false, Ordering::SeqCst);
    let count = submit_parallel(&executor, &statements, 4, &env).await.unwrap();
    assert_eq!(count, 6);
}
