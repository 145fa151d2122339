//! Dictionary descriptors
//!
//! A dictionary is declared either directly or as a table whose
//! `ClickHouse:IsDictionary` annotation is set, in which case
//! [`DictionaryDescriptor::from_table`] reads the dictionary annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};

use super::annotations;
use super::column::ColumnDescriptor;
use super::table::TableMetadata;
use super::value_source::ValueSource;

pub const DEFAULT_LIFETIME_MIN: u64 = 300;
pub const DEFAULT_LIFETIME_MAX: u64 = 360;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryLayout {
    Flat,
    Hashed,
    ComplexKeyHashed,
    Cache { size_in_cells: u64 },
    Direct,
}

impl DictionaryLayout {
    fn parse(raw: &str, cache_size: Option<u64>) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "flat" => Ok(DictionaryLayout::Flat),
            "hashed" => Ok(DictionaryLayout::Hashed),
            "complex_key_hashed" => Ok(DictionaryLayout::ComplexKeyHashed),
            "direct" => Ok(DictionaryLayout::Direct),
            "cache" => Ok(DictionaryLayout::Cache {
                size_in_cells: cache_size.ok_or_else(|| {
                    MappingError::configuration("cache dictionary layout requires a cache size")
                })?,
            }),
            other => Err(MappingError::configuration(format!(
                "unknown dictionary layout '{}'",
                other
            ))),
        }
    }

    /// Whether the layout addresses rows by a single numeric key
    pub fn is_simple_key(&self) -> bool {
        matches!(
            self,
            DictionaryLayout::Flat | DictionaryLayout::Hashed | DictionaryLayout::Cache { .. }
        )
    }

    pub fn render(&self) -> String {
        match self {
            DictionaryLayout::Flat => "FLAT()".to_string(),
            DictionaryLayout::Hashed => "HASHED()".to_string(),
            DictionaryLayout::ComplexKeyHashed => "COMPLEX_KEY_HASHED()".to_string(),
            DictionaryLayout::Cache { size_in_cells } => {
                format!("CACHE(SIZE_IN_CELLS {})", size_in_cells)
            }
            DictionaryLayout::Direct => "DIRECT()".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DictionaryLifetime {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl Default for DictionaryLifetime {
    fn default() -> Self {
        Self {
            min_seconds: DEFAULT_LIFETIME_MIN,
            max_seconds: DEFAULT_LIFETIME_MAX,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClickHouseSource {
    pub table: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub host: Option<ValueSource>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<ValueSource>,
    #[serde(default)]
    pub password: Option<ValueSource>,
    /// Custom SELECT used instead of reading the whole table
    #[serde(default)]
    pub query: Option<String>,
}

/// Connection settings shared by the PostgreSQL and MySQL sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSource {
    pub host: ValueSource,
    pub port: u16,
    pub user: ValueSource,
    pub password: ValueSource,
    pub database: ValueSource,
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpSource {
    pub url: ValueSource,
    #[serde(default = "default_http_format")]
    pub format: String,
}

fn default_http_format() -> String {
    "JSONEachRow".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedisSource {
    pub host: ValueSource,
    pub port: u16,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub db_index: Option<u32>,
    #[serde(default)]
    pub password: Option<ValueSource>,
}

/// Resolved dictionary source: exactly one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionarySource {
    ClickHouse(ClickHouseSource),
    Postgres(ServerSource),
    MySql(ServerSource),
    Http(HttpSource),
    Redis(RedisSource),
}

/// Declared source configuration, one optional member per source kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DictionarySourceConfig {
    #[serde(default)]
    pub clickhouse: Option<ClickHouseSource>,
    #[serde(default)]
    pub postgres: Option<ServerSource>,
    #[serde(default)]
    pub mysql: Option<ServerSource>,
    #[serde(default)]
    pub http: Option<HttpSource>,
    #[serde(default)]
    pub redis: Option<RedisSource>,
}

impl DictionarySourceConfig {
    /// The single configured source. Zero or several configured sources is an error.
    pub fn resolve(&self, dictionary: &str) -> Result<DictionarySource> {
        let mut found = Vec::new();
        if let Some(s) = &self.clickhouse {
            found.push(DictionarySource::ClickHouse(s.clone()));
        }
        if let Some(s) = &self.postgres {
            found.push(DictionarySource::Postgres(s.clone()));
        }
        if let Some(s) = &self.mysql {
            found.push(DictionarySource::MySql(s.clone()));
        }
        if let Some(s) = &self.http {
            found.push(DictionarySource::Http(s.clone()));
        }
        if let Some(s) = &self.redis {
            found.push(DictionarySource::Redis(s.clone()));
        }

        let context = format!("In CREATE DICTIONARY \"{}\"", dictionary);
        match found.len() {
            0 => Err(MappingError::configuration_with_context(
                "no dictionary source configured",
                context,
            )),
            1 => Ok(found.remove(0)),
            n => Err(MappingError::configuration_with_context(
                format!("{} dictionary sources configured, exactly one is allowed", n),
                context,
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DictionaryDescriptor {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    /// Resolved names of the key columns
    pub key_columns: Vec<String>,
    pub layout: DictionaryLayout,
    #[serde(default)]
    pub lifetime: DictionaryLifetime,
    /// Per-column default value used when a key is missing
    #[serde(default)]
    pub defaults: BTreeMap<String, serde_json::Value>,
    pub source: DictionarySourceConfig,
}

impl DictionaryDescriptor {
    /// Build a dictionary descriptor from a table flagged as a dictionary.
    pub fn from_table(table: &TableMetadata) -> Result<Self> {
        let ann = &table.annotations;

        let mut key_columns = ann.get_list(annotations::DICTIONARY_KEY);
        if key_columns.is_empty() {
            key_columns = table.key_columns.clone();
        }

        let layout = match ann.get(annotations::DICTIONARY_LAYOUT) {
            Some(raw) => {
                DictionaryLayout::parse(raw, ann.get_u64(annotations::DICTIONARY_CACHE_SIZE)?)?
            }
            None if key_columns.len() > 1 => DictionaryLayout::ComplexKeyHashed,
            None => DictionaryLayout::Hashed,
        };

        let lifetime = DictionaryLifetime {
            min_seconds: ann
                .get_u64(annotations::DICTIONARY_LIFETIME_MIN)?
                .unwrap_or(DEFAULT_LIFETIME_MIN),
            max_seconds: ann
                .get_u64(annotations::DICTIONARY_LIFETIME_MAX)?
                .unwrap_or(DEFAULT_LIFETIME_MAX),
        };

        let source = ann
            .get_json::<DictionarySourceConfig>(annotations::DICTIONARY_SOURCE)?
            .unwrap_or_default();
        let defaults = ann
            .get_json::<BTreeMap<String, serde_json::Value>>(annotations::DICTIONARY_DEFAULTS)?
            .unwrap_or_default();

        Ok(Self {
            name: table.name.clone(),
            schema: table.schema.clone(),
            columns: table.columns.clone(),
            key_columns,
            layout,
            lifetime,
            defaults,
            source,
        })
    }

    /// Structural checks that must hold before any SQL is generated
    pub fn validate(&self) -> Result<()> {
        let context = format!("In CREATE DICTIONARY \"{}\"", self.name);
        if self.key_columns.is_empty() {
            return Err(MappingError::configuration_with_context(
                "dictionary has no key columns",
                context,
            ));
        }
        if self.key_columns.len() > 1 && self.layout.is_simple_key() {
            return Err(MappingError::configuration_with_context(
                format!(
                    "layout {} supports a single key column, got {}",
                    self.layout.render(),
                    self.key_columns.len()
                ),
                context,
            ));
        }
        for key in &self.key_columns {
            if !self.columns.iter().any(|c| &c.resolved_name() == key) {
                return Err(MappingError::configuration_with_context(
                    format!("key column '{}' is not a dictionary column", key),
                    context,
                ));
            }
        }
        if self.lifetime.min_seconds > self.lifetime.max_seconds {
            return Err(MappingError::configuration_with_context(
                format!(
                    "lifetime MIN {} exceeds MAX {}",
                    self.lifetime.min_seconds, self.lifetime.max_seconds
                ),
                context,
            ));
        }
        self.source.resolve(&self.name).map(|_| ())
    }
}
