use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::ddl::DdlBuilder;
use crate::migrations::DEFAULT_HISTORY_TABLE;
use crate::modification::{DeleteStrategy, InsertFormat, DEFAULT_MAX_ROWS_PER_INSERT};
use crate::type_mapping::{TypeMappingRegistry, DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Provider configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[validate(schema(function = "validate_decimal_scale"))]
#[serde(default)]
pub struct ProviderConfig {
    /// Row deletion form
    pub delete_strategy: DeleteStrategy,

    /// Body format of bulk inserts
    pub insert_format: InsertFormat,

    /// Rows per INSERT statement before a batch is split
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Max rows per insert must be between 1 and 1000000"
    ))]
    pub max_rows_per_insert: usize,

    #[validate(range(
        min = 1,
        max = 76,
        message = "Decimal precision must be between 1 and 76"
    ))]
    pub decimal_precision: u8,

    pub decimal_scale: u8,

    /// Emit `IF [NOT] EXISTS` guards on DDL
    pub idempotent_ddl: bool,

    /// Database for tables declared without a schema
    pub default_database: Option<String>,

    /// Insert statements submitted concurrently by the orchestrator
    #[validate(range(
        min = 1,
        max = 64,
        message = "Insert parallelism must be between 1 and 64"
    ))]
    pub insert_parallelism: usize,

    /// Table recording applied migration units
    #[validate(length(min = 1, message = "History table cannot be empty"))]
    pub history_table: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            delete_strategy: DeleteStrategy::Lightweight,
            insert_format: InsertFormat::Values,
            max_rows_per_insert: DEFAULT_MAX_ROWS_PER_INSERT,
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            decimal_scale: DEFAULT_DECIMAL_SCALE,
            idempotent_ddl: true,
            default_database: None,
            insert_parallelism: 1,
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
        }
    }
}

fn validate_decimal_scale(config: &ProviderConfig) -> Result<(), ValidationError> {
    if config.decimal_scale > config.decimal_precision {
        let mut err = ValidationError::new("decimal_scale");
        err.message = Some("Decimal scale cannot exceed decimal precision".into());
        return Err(err);
    }
    Ok(())
}

impl ProviderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            delete_strategy: parse_env_var("CLICKMAP_DELETE_STRATEGY", "lightweight")?,
            insert_format: parse_env_var("CLICKMAP_INSERT_FORMAT", "values")?,
            max_rows_per_insert: parse_env_var("CLICKMAP_MAX_ROWS_PER_INSERT", "10000")?,
            decimal_precision: parse_env_var("CLICKMAP_DECIMAL_PRECISION", "18")?,
            decimal_scale: parse_env_var("CLICKMAP_DECIMAL_SCALE", "4")?,
            idempotent_ddl: parse_env_var("CLICKMAP_IDEMPOTENT_DDL", "true")?,
            default_database: optional_env_var("CLICKMAP_DEFAULT_DATABASE")?
                .filter(|db| !db.trim().is_empty()),
            insert_parallelism: parse_env_var("CLICKMAP_INSERT_PARALLELISM", "1")?,
            history_table: optional_env_var("CLICKMAP_HISTORY_TABLE")?
                .unwrap_or_else(|| DEFAULT_HISTORY_TABLE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn type_registry(&self) -> TypeMappingRegistry {
        TypeMappingRegistry::with_decimal(self.decimal_precision, self.decimal_scale)
    }

    pub fn ddl_builder(&self) -> DdlBuilder {
        DdlBuilder::new(self.type_registry())
            .with_idempotent(self.idempotent_ddl)
            .with_default_database(self.default_database.clone())
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

/// Read an optional string variable; a value that is not valid unicode is an error
fn optional_env_var(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
