//! SQL literal and identifier formatting
//!
//! Foundation for every builder in the crate: identifiers are always quoted,
//! values are always inlined as escaped literals.

mod identifier;
mod literal;

pub use identifier::{
    qualified_name, quote_identifier, to_snake_case, unquote_identifier, IDENTIFIER_QUOTE,
};
pub use literal::{quote_string, render_literal, BoolStyle, LiteralStyle, SqlValue, StringEscape};

/// Quote `raw` as an identifier when it is a bare name, otherwise pass it
/// through as an expression (`toYYYYMM(ts)`, `tuple()`, `id % 16`).
pub fn identifier_or_expression(raw: &str) -> String {
    let raw = raw.trim();
    let is_bare_name = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !raw.starts_with(|c: char| c.is_ascii_digit());
    if is_bare_name {
        quote_identifier(raw)
    } else {
        raw.to_string()
    }
}
