//! Type Mapping Registry
//!
//! Maps abstract property types to ClickHouse column types, and resolves the
//! placeholder types used for `{name:Type}` parameters.

mod clr_type;
mod registry;

pub use clr_type::{ClrType, EnumStorage};
pub use registry::{
    TypeMappingRegistry, DATETIME_PRECISION, DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE,
};
