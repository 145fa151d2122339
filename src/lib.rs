//! Clickmap - relational-mapping SQL provider for ClickHouse
//!
//! This crate turns pre-resolved model metadata into ClickHouse SQL:
//! - DDL for tables, materialized views, dictionaries, indexes and projections
//! - Phase-ordered migrations executed as resumable single-operation units
//! - Expression trees translated to WHERE clauses and parameterized views
//! - Bulk INSERT and DELETE batches

pub mod config;
pub mod ddl;
pub mod errors;
pub mod expression;
pub mod metadata;
pub mod migrations;
pub mod modification;
pub mod sql_formatter;
pub mod statement;
pub mod type_mapping;

pub use errors::{MappingError, Result};
pub use statement::SqlStatement;
