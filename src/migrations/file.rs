//! YAML migration documents
//!
//! ```yaml
//! id: 20260101_init
//! operations:
//!   - op: create_table
//!     table:
//!       name: events
//!       columns:
//!         - { property: Id, clr_type: u_int64 }
//!   - op: drop_index
//!     table: events
//!     name: ix_old
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ddl::SchemaOperation;
use crate::errors::{MappingError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationFile {
    /// Prefix of every unit id recorded for this migration
    pub id: String,
    #[serde(default)]
    pub operations: Vec<SchemaOperation>,
}

impl MigrationFile {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: Self = serde_yaml::from_str(content).map_err(|e| MappingError::Serialization {
            key: "migration".to_string(),
            message: e.to_string(),
        })?;
        if file.id.trim().is_empty() || file.id.contains('#') {
            return Err(MappingError::configuration(format!(
                "migration id '{}' must be non-empty and must not contain '#'",
                file.id
            )));
        }
        Ok(file)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MappingError::configuration_with_context(
                format!("cannot read migration file: {}", e),
                path.display().to_string(),
            )
        })?;
        Self::from_yaml_str(&content)
    }
}
