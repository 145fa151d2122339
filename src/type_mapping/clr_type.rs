//! Abstract property types handed over by the hosting model layer

use std::fmt;

use serde::{Deserialize, Serialize};

/// How enum-typed properties are stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnumStorage {
    /// Underlying integer value in an `Int64` column
    #[default]
    Integer,
    /// Member name in a `LowCardinality(String)` column
    Name,
}

/// Property type tag as resolved by the model layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClrType {
    Bool,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    String,
    Char,
    DateOnly,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Guid,
    Bytes,
    Enum(EnumStorage),
    Array(Box<ClrType>),
    Json,
    /// A named model type with no dialect counterpart
    Other(String),
}

impl ClrType {
    pub fn array_of(element: ClrType) -> Self {
        ClrType::Array(Box::new(element))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ClrType::Array(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ClrType::String | ClrType::Char)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ClrType::DateOnly | ClrType::DateTime | ClrType::DateTimeOffset
        )
    }
}

impl fmt::Display for ClrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClrType::Enum(storage) => write!(f, "Enum({:?})", storage),
            ClrType::Array(element) => write!(f, "Array<{}>", element),
            ClrType::Other(name) => f.write_str(name),
            other => write!(f, "{:?}", other),
        }
    }
}
