//! Unit tests - formatter and translator properties checked over many inputs
//!
//! None of these need a running ClickHouse instance.

mod expression_tests;
mod formatter_property_tests;
