//! Property type → ClickHouse column type mapping

use log::debug;

use crate::errors::{MappingError, Result};
use crate::metadata::{annotations, ColumnDescriptor, NestedField};
use crate::sql_formatter::{quote_identifier, quote_string, StringEscape};

use super::clr_type::{ClrType, EnumStorage};

pub const DEFAULT_DECIMAL_PRECISION: u8 = 18;
pub const DEFAULT_DECIMAL_SCALE: u8 = 4;
/// Millisecond precision for every timestamp column
pub const DATETIME_PRECISION: u8 = 3;

/// Immutable type-mapping table.
///
/// Built once from configuration and shared read-only by every builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMappingRegistry {
    decimal_precision: u8,
    decimal_scale: u8,
}

impl Default for TypeMappingRegistry {
    fn default() -> Self {
        Self {
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            decimal_scale: DEFAULT_DECIMAL_SCALE,
        }
    }
}

impl TypeMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the `Decimal(P, S)` parameters
    pub fn with_decimal(precision: u8, scale: u8) -> Self {
        Self {
            decimal_precision: precision,
            decimal_scale: scale,
        }
    }

    /// Base (non-nullable) column type for `ty`.
    pub fn base_type(&self, ty: &ClrType) -> Result<String> {
        let mapped = match ty {
            ClrType::Bool | ClrType::Byte => "UInt8".to_string(),
            ClrType::SByte => "Int8".to_string(),
            ClrType::Int16 => "Int16".to_string(),
            ClrType::UInt16 => "UInt16".to_string(),
            ClrType::Int32 => "Int32".to_string(),
            ClrType::UInt32 => "UInt32".to_string(),
            ClrType::Int64 => "Int64".to_string(),
            ClrType::UInt64 => "UInt64".to_string(),
            ClrType::Single => "Float32".to_string(),
            ClrType::Double => "Float64".to_string(),
            ClrType::Decimal => format!("Decimal({}, {})", self.decimal_precision, self.decimal_scale),
            ClrType::String | ClrType::Bytes => "String".to_string(),
            ClrType::DateOnly => "Date".to_string(),
            ClrType::DateTime => format!("DateTime64({})", DATETIME_PRECISION),
            ClrType::DateTimeOffset => format!("DateTime64({}, 'UTC')", DATETIME_PRECISION),
            ClrType::Guid => "UUID".to_string(),
            ClrType::Enum(EnumStorage::Integer) => "Int64".to_string(),
            ClrType::Enum(EnumStorage::Name) => "LowCardinality(String)".to_string(),
            ClrType::Array(element) => format!("Array({})", self.base_type(element)?),
            ClrType::Json => "JSON".to_string(),
            ClrType::Char | ClrType::TimeSpan | ClrType::Other(_) => {
                return Err(MappingError::unsupported_type(
                    ty.to_string(),
                    "no ClickHouse column type is registered for it",
                ))
            }
        };
        Ok(mapped)
    }

    /// Column type for `ty`, wrapped in `Nullable(...)` when `nullable` and the
    /// type can carry it.
    pub fn map_type(&self, ty: &ClrType, nullable: bool) -> Result<String> {
        let base = self.base_type(ty)?;
        Ok(if nullable { wrap_nullable(&base) } else { base })
    }

    /// Column type for a full column descriptor.
    ///
    /// An explicit column type always wins. Otherwise per-column annotations
    /// refine the mapping: timezone for timestamps, dynamic-path limits for JSON.
    pub fn map_column(&self, column: &ColumnDescriptor) -> Result<String> {
        if let Some(explicit) = column.column_type.as_deref().filter(|t| !t.trim().is_empty()) {
            if column.annotations.contains(annotations::TIMEZONE) {
                debug!(
                    "Column '{}' has an explicit type; ignoring its timezone annotation",
                    column.property
                );
            }
            return Ok(explicit.trim().to_string());
        }

        if !column.nested.is_empty() {
            return self.nested_type(&column.nested);
        }

        let base = match (&column.clr_type, column.annotations.get(annotations::TIMEZONE)) {
            (ClrType::DateTime | ClrType::DateTimeOffset, Some(tz)) => format!(
                "DateTime64({}, {})",
                DATETIME_PRECISION,
                quote_string(tz, StringEscape::QuoteDoubling)
            ),
            (ClrType::Json, _) => json_type(column)?,
            (ty, _) => self.base_type(ty).map_err(|e| match e {
                MappingError::UnsupportedType { type_name, .. } => MappingError::unsupported_type(
                    type_name,
                    format!("column '{}'", column.property),
                ),
                other => other,
            })?,
        };

        Ok(if column.nullable { wrap_nullable(&base) } else { base })
    }

    /// Placeholder type for a `{name:Type}` query parameter
    pub fn parameter_type(&self, ty: &ClrType, nullable: bool) -> Result<String> {
        match ty {
            // parameters carry serialized JSON text
            ClrType::Json => Ok(if nullable { "Nullable(String)" } else { "String" }.to_string()),
            _ => self.map_type(ty, nullable),
        }
    }

    fn nested_type(&self, fields: &[NestedField]) -> Result<String> {
        let rendered = fields
            .iter()
            .map(|field| {
                Ok(format!(
                    "{} {}",
                    quote_identifier(&field.name),
                    self.map_type(&field.clr_type, field.nullable)?
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("Nested({})", rendered.join(", ")))
    }
}

fn json_type(column: &ColumnDescriptor) -> Result<String> {
    let mut options = Vec::new();
    if let Some(paths) = column.annotations.get_u64(annotations::JSON_MAX_DYNAMIC_PATHS)? {
        options.push(format!("max_dynamic_paths={}", paths));
    }
    if let Some(types) = column.annotations.get_u64(annotations::JSON_MAX_DYNAMIC_TYPES)? {
        options.push(format!("max_dynamic_types={}", types));
    }
    Ok(if options.is_empty() {
        "JSON".to_string()
    } else {
        format!("JSON({})", options.join(", "))
    })
}

/// Wrap in `Nullable(...)` unless the type is a container that cannot be.
fn wrap_nullable(base: &str) -> String {
    if base.starts_with("Nullable(")
        || base.starts_with("Array(")
        || base.starts_with("Nested(")
        || base.starts_with("Map(")
        || base.starts_with("JSON")
    {
        return base.to_string();
    }
    if let Some(inner) = base
        .strip_prefix("LowCardinality(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return format!("LowCardinality(Nullable({}))", inner);
    }
    format!("Nullable({})", base)
}
