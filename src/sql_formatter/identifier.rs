//! Identifier quoting and name conventions

/// Identifier quote character used for every table, column, view and index name.
pub const IDENTIFIER_QUOTE: char = '"';

/// Quote a ClickHouse identifier.
///
/// Embedded quote characters are doubled, so the output is always a single
/// well-formed identifier regardless of what the name contains.
///
/// # Examples
/// ```
/// use clickmap::sql_formatter::quote_identifier;
/// assert_eq!(quote_identifier("user_id"), "\"user_id\"");
/// assert_eq!(quote_identifier("id.orig_h"), "\"id.orig_h\"");
/// assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(IDENTIFIER_QUOTE);
    for c in name.chars() {
        if c == IDENTIFIER_QUOTE {
            quoted.push(IDENTIFIER_QUOTE);
        }
        quoted.push(c);
    }
    quoted.push(IDENTIFIER_QUOTE);
    quoted
}

/// Inverse of [`quote_identifier`]. Returns `None` when `quoted` is not a
/// well-formed quoted identifier.
pub fn unquote_identifier(quoted: &str) -> Option<String> {
    let inner = quoted
        .strip_prefix(IDENTIFIER_QUOTE)?
        .strip_suffix(IDENTIFIER_QUOTE)?;
    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == IDENTIFIER_QUOTE {
            // a lone quote inside the body means the input was not produced by quote_identifier
            if chars.next() != Some(IDENTIFIER_QUOTE) {
                return None;
            }
        }
        name.push(c);
    }
    Some(name)
}

/// Format an optionally database-qualified object name: `"db"."table"` or `"table"`.
pub fn qualified_name(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quote_identifier(schema), quote_identifier(name))
        }
        _ => quote_identifier(name),
    }
}

/// Convert a property name to snake_case.
///
/// Inserts `_` before every uppercase character except the first and
/// lowercases it. Names that already contain `_` are treated as snake_case
/// and only lowercased, so `"Some_HTTPName"` becomes `"some_httpname"`.
///
/// # Examples
/// ```
/// use clickmap::sql_formatter::to_snake_case;
/// assert_eq!(to_snake_case("EventTime"), "event_time");
/// assert_eq!(to_snake_case("user_Id"), "user_id");
/// assert_eq!(to_snake_case("ID"), "i_d");
/// ```
pub fn to_snake_case(name: &str) -> String {
    if name.contains('_') {
        return name.to_lowercase();
    }

    let mut snake = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}
