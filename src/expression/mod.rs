//! Expression translation
//!
//! Turns caller-built expression trees into ClickHouse SQL fragments:
//! predicates, JSON subcolumn paths, dictionary lookups and the WHERE
//! clauses of parameterized views.

pub mod ast;
mod json_path;
pub mod methods;
mod translator;
mod where_clause;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use json_path::{JsonPath, JsonPathSegment};
pub use methods::{get_method_spec, supported_methods, KnownMethod, MethodSpec, TargetRule};
pub use translator::ExpressionTranslator;
pub use where_clause::{build_where_clause, collect_parameters};
