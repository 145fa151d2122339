//! # Mapping Error Types
//!
//! Every builder and translator in this crate fails with a [`MappingError`]
//! instead of emitting malformed SQL. There is no best-effort mode.
//!
//! ## Error Categories
//!
//! - **UnsupportedOperation**: the dialect cannot express the request at all
//!   (row-level UPDATE, writes to a read-only external table)
//! - **UnsupportedType**: a declared type or value has no column-type mapping
//! - **Configuration**: descriptor state is missing or contradictory
//!   (no key columns for DELETE, two dictionary sources, ORDER BY on a `Null` engine)
//! - **MalformedExpression**: an expression tree outside the supported grammar
//!
//! ## Usage Patterns
//!
//! ```ignore
//! // Say what is missing and where it was needed
//! MappingError::configuration_with_context(
//!     "table has no key columns",
//!     "While building DELETE for \"events\"",
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Type '{type_name}' is not supported; use the explicit column type override ({context})")]
    UnsupportedType { type_name: String, context: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unsupported expression: {node} ({reason})")]
    MalformedExpression { node: String, reason: String },
    #[error("Invalid value for {target}: {message}")]
    InvalidValue { target: String, message: String },
    #[error("Failed to deserialize annotation '{key}': {message}")]
    Serialization { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, MappingError>;

/// Helper methods for creating errors with context information
impl MappingError {
    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        MappingError::UnsupportedOperation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        MappingError::Configuration(message.into())
    }

    /// Create a Configuration error with context information
    ///
    /// # Example
    /// ```ignore
    /// MappingError::configuration_with_context(
    ///     "no dictionary source configured",
    ///     "In CREATE DICTIONARY \"countries\"",
    /// )
    /// ```
    pub fn configuration_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let msg = message.into();
        let ctx = context.into();
        MappingError::Configuration(format!("{}\n  Context: {}", msg, ctx))
    }

    pub fn unsupported_type(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        MappingError::UnsupportedType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    /// Create a MalformedExpression error carrying the offending node's text
    pub fn malformed(node: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        MappingError::MalformedExpression {
            node: node.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(target: impl Into<String>, message: impl Into<String>) -> Self {
        MappingError::InvalidValue {
            target: target.into(),
            message: message.into(),
        }
    }
}
