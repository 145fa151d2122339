//! ClickHouse-backed executor and applied-unit history

use std::collections::HashSet;

use async_trait::async_trait;
use clickhouse::{Client, Row};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::sql_formatter::quote_identifier;

use super::runner::{AppliedUnitLog, RunError, StatementExecutor};
use super::sorter::MigrationUnit;

pub const DEFAULT_HISTORY_TABLE: &str = "__clickmap_history";

/// Connection settings for [`ClickHouseExecutor::from_settings`]
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

pub fn build_client(settings: &ConnectionSettings) -> Client {
    let mut client = Client::default().with_url(settings.url.clone());
    if let Some(user) = &settings.user {
        client = client.with_user(user.clone());
    }
    if let Some(password) = &settings.password {
        client = client.with_password(password.clone());
    }
    if let Some(database) = &settings.database {
        client = client.with_database(database.clone());
    }
    // DDL returns only after the server finished it
    client.with_option("wait_end_of_query", "1")
}

#[derive(Clone)]
pub struct ClickHouseExecutor {
    client: Client,
}

impl ClickHouseExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        Self::new(build_client(settings))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// `?` is the client's bind marker; statement text carries no binds.
fn escape_bind_markers(sql: &str) -> String {
    sql.replace('?', "??")
}

#[async_trait]
impl StatementExecutor for ClickHouseExecutor {
    async fn execute(&self, sql: &str) -> Result<(), RunError> {
        self.client
            .query(&escape_bind_markers(sql))
            .execute()
            .await?;
        Ok(())
    }
}

#[derive(Debug, Row, Deserialize)]
struct AppliedRow {
    unit_id: String,
}

#[derive(Debug, Row, Serialize)]
struct HistoryRow {
    migration_id: String,
    unit_id: String,
    operation: String,
    /// DateTime64(3), milliseconds since the epoch
    applied_at: i64,
}

/// Applied units stored in a MergeTree table
#[derive(Clone)]
pub struct ClickHouseUnitLog {
    client: Client,
    table: String,
}

impl ClickHouseUnitLog {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             migration_id String, unit_id String, operation String, applied_at DateTime64(3)\
             ) ENGINE = MergeTree ORDER BY (migration_id, unit_id)",
            quote_identifier(&self.table)
        )
    }
}

#[async_trait]
impl AppliedUnitLog for ClickHouseUnitLog {
    async fn ensure(&self) -> Result<(), RunError> {
        debug!("Ensuring history table {}", self.table);
        self.client.query(&self.create_table_sql()).execute().await?;
        Ok(())
    }

    async fn applied(&self, migration_id: &str) -> Result<HashSet<String>, RunError> {
        let sql = format!(
            "SELECT unit_id FROM {} WHERE migration_id = ?",
            quote_identifier(&self.table)
        );
        let rows = self
            .client
            .query(&sql)
            .bind(migration_id)
            .fetch_all::<AppliedRow>()
            .await?;
        Ok(rows.into_iter().map(|row| row.unit_id).collect())
    }

    async fn record(&self, migration_id: &str, unit: &MigrationUnit) -> Result<(), RunError> {
        let row = HistoryRow {
            migration_id: migration_id.to_string(),
            unit_id: unit.unit_id(migration_id),
            operation: unit.operation.to_string(),
            applied_at: chrono::Utc::now().timestamp_millis(),
        };
        let mut insert = self.client.insert(&self.table)?;
        insert.write(&row).await?;
        insert.end().await?;
        Ok(())
    }
}
