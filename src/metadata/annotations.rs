//! String-keyed annotation maps attached to tables, columns and indexes
//!
//! The model layer resolves attributes and conventions into these flat maps;
//! nothing in this crate inspects model types directly.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};

pub const ENGINE: &str = "ClickHouse:Engine";
pub const ORDER_BY: &str = "ClickHouse:OrderBy";
pub const PARTITION_BY: &str = "ClickHouse:PartitionBy";
pub const PRIMARY_KEY: &str = "ClickHouse:PrimaryKey";
pub const TTL: &str = "ClickHouse:Ttl";
pub const SAMPLE_BY: &str = "ClickHouse:SampleBy";
pub const SETTINGS: &str = "ClickHouse:Settings";
pub const COMMENT: &str = "ClickHouse:Comment";

pub const VERSION_COLUMN: &str = "ClickHouse:VersionColumn";
pub const IS_DELETED_COLUMN: &str = "ClickHouse:IsDeletedColumn";
pub const SIGN_COLUMN: &str = "ClickHouse:SignColumn";
pub const SUM_COLUMNS: &str = "ClickHouse:SumColumns";

pub const DISTRIBUTED_CLUSTER: &str = "ClickHouse:Distributed:Cluster";
pub const DISTRIBUTED_DATABASE: &str = "ClickHouse:Distributed:Database";
pub const DISTRIBUTED_TABLE: &str = "ClickHouse:Distributed:Table";
pub const DISTRIBUTED_SHARDING_KEY: &str = "ClickHouse:Distributed:ShardingKey";
pub const DISTRIBUTED_POLICY: &str = "ClickHouse:Distributed:Policy";

pub const IS_MATERIALIZED_VIEW: &str = "ClickHouse:IsMaterializedView";
pub const MATERIALIZED_VIEW_SOURCE: &str = "ClickHouse:MaterializedView:Source";
pub const MATERIALIZED_VIEW_QUERY: &str = "ClickHouse:MaterializedView:Query";
pub const MATERIALIZED_VIEW_TO: &str = "ClickHouse:MaterializedView:To";
pub const MATERIALIZED_VIEW_POPULATE: &str = "ClickHouse:MaterializedView:Populate";

pub const IS_DICTIONARY: &str = "ClickHouse:IsDictionary";
pub const DICTIONARY_KEY: &str = "ClickHouse:Dictionary:Key";
pub const DICTIONARY_LAYOUT: &str = "ClickHouse:Dictionary:Layout";
pub const DICTIONARY_CACHE_SIZE: &str = "ClickHouse:Dictionary:CacheSize";
pub const DICTIONARY_LIFETIME_MIN: &str = "ClickHouse:Dictionary:LifetimeMin";
pub const DICTIONARY_LIFETIME_MAX: &str = "ClickHouse:Dictionary:LifetimeMax";
pub const DICTIONARY_SOURCE: &str = "ClickHouse:Dictionary:Source";
pub const DICTIONARY_DEFAULTS: &str = "ClickHouse:Dictionary:Defaults";

pub const TIMEZONE: &str = "ClickHouse:Timezone";
pub const JSON_MAX_DYNAMIC_PATHS: &str = "ClickHouse:Json:MaxDynamicPaths";
pub const JSON_MAX_DYNAMIC_TYPES: &str = "ClickHouse:Json:MaxDynamicTypes";
pub const CODEC: &str = "ClickHouse:Codec";

/// Flat annotation map. Keys are the `ClickHouse:*` constants in this module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Trimmed value, `None` when absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Boolean flag. Absent means `false`.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
            Some(v) => Err(MappingError::configuration(format!(
                "annotation '{}' must be a boolean, got '{}'",
                key, v
            ))),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    MappingError::configuration(format!(
                        "annotation '{}' must be a non-negative integer, got '{}'",
                        key, v
                    ))
                })
            })
            .transpose()
    }

    /// Comma-separated list; commas nested inside parentheses or quotes do not split.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_top_level).unwrap_or_default()
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| MappingError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Annotations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Annotations(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Split `a, f(b, c), 'x,y'` into `["a", "f(b, c)", "'x,y'"]`.
pub fn split_top_level(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in raw.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' | '[' if !in_quote => depth += 1,
            ')' | ']' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}
