//! Pre-resolved model metadata
//!
//! Everything here is produced by the hosting model layer's discovery pass
//! and consumed read-only by the builders.

pub mod annotations;
mod column;
mod dictionary;
mod engine;
mod table;
mod value_source;

pub use annotations::Annotations;
pub use column::{ColumnDescriptor, ComputedColumn, NestedField};
pub use dictionary::{
    ClickHouseSource, DictionaryDescriptor, DictionaryLayout, DictionaryLifetime,
    DictionarySource, DictionarySourceConfig, HttpSource, RedisSource, ServerSource,
};
pub use engine::{DatabaseToken, TableEngine};
pub use table::{ColumnNameMap, ExternalTable, TableMetadata};
pub(crate) use value_source::ENV_PLACEHOLDER_PREFIX;
pub use value_source::{env_placeholder, ValueSource};
