use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clickmap::config::ProviderConfig;
use clickmap::migrations::{
    build_client, ClickHouseExecutor, ClickHouseUnitLog, ConnectionSettings, MigrationFile,
    MigrationPlanner, MigrationRunner,
};

/// Clickmap - phase-ordered ClickHouse migrations
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider configuration file (YAML); CLICKMAP_* variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the phase-sorted units of a migration and their SQL
    Plan {
        /// Migration document (YAML)
        file: PathBuf,
    },
    /// Execute a migration, skipping units already recorded as applied
    Apply {
        /// Migration document (YAML)
        file: PathBuf,

        /// ClickHouse HTTP endpoint (defaults to CLICKHOUSE_URL)
        #[arg(long)]
        url: Option<String>,

        /// Defaults to CLICKHOUSE_USER
        #[arg(long)]
        user: Option<String>,

        /// Defaults to CLICKHOUSE_PASSWORD
        #[arg(long)]
        password: Option<String>,

        /// Defaults to CLICKHOUSE_DATABASE
        #[arg(long)]
        database: Option<String>,
    },
}

fn read_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ProviderConfig> {
    let config = match path {
        Some(path) => ProviderConfig::from_yaml_file(path),
        None => ProviderConfig::from_env(),
    };
    config.context("Configuration error")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let planner = MigrationPlanner::new(config.ddl_builder());

    match cli.command {
        Command::Plan { file } => {
            let migration = MigrationFile::from_yaml_file(&file)?;
            let units = planner.plan_statements(migration.operations)?;
            for planned in &units {
                println!(
                    "-- {} phase {}: {}",
                    planned.unit.unit_id(&migration.id),
                    planned.unit.phase,
                    planned.unit.operation
                );
                for statement in &planned.statements {
                    println!("{};", statement.sql);
                }
            }
        }
        Command::Apply {
            file,
            url,
            user,
            password,
            database,
        } => {
            let migration = MigrationFile::from_yaml_file(&file)?;
            // plan fully before touching the server
            let units = planner.plan_statements(migration.operations)?;

            let settings = ConnectionSettings {
                url: url
                    .or_else(|| read_env_var("CLICKHOUSE_URL"))
                    .context("No ClickHouse URL: pass --url or set CLICKHOUSE_URL")?,
                user: user.or_else(|| read_env_var("CLICKHOUSE_USER")),
                password: password.or_else(|| read_env_var("CLICKHOUSE_PASSWORD")),
                database: database.or_else(|| read_env_var("CLICKHOUSE_DATABASE")),
            };
            let client = build_client(&settings);
            let runner = MigrationRunner::new(
                ClickHouseExecutor::new(client.clone()),
                ClickHouseUnitLog::new(client, config.history_table.clone()),
            );

            let report = runner.run(&migration.id, &units).await?;
            println!(
                "Migration {}: {} applied, {} skipped",
                migration.id,
                report.applied.len(),
                report.skipped.len()
            );
        }
    }
    Ok(())
}
