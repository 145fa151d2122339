use clickmap::sql_formatter::{
    quote_identifier, render_literal, to_snake_case, unquote_identifier, LiteralStyle, SqlValue,
};
use clickmap::type_mapping::ClrType;
use test_case::test_case;

const NAMES: &[&str] = &[
    "",
    "plain",
    "\"",
    "\"\"",
    "a\"b",
    "\"leading",
    "trailing\"",
    "many\"\"\"quotes\"",
    "id.orig_h",
    "Ünïcødé \"name\"",
];

#[test]
fn test_identifier_quoting_round_trips() {
    for name in NAMES {
        let quoted = quote_identifier(name);
        assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        assert_eq!(unquote_identifier(&quoted).as_deref(), Some(*name), "{quoted}");
    }
}

#[test_case("EventTime")]
#[test_case("ID")]
#[test_case("already_snake")]
#[test_case("Mixed_Case")]
#[test_case("userIdV2")]
#[test_case("")]
#[test_case("ÄpfelBaum")]
fn test_snake_case_is_idempotent(name: &str) {
    let once = to_snake_case(name);
    assert_eq!(to_snake_case(&once), once);
}

#[test]
fn test_null_renders_null_for_every_type() {
    let types = [
        ClrType::Bool,
        ClrType::Int32,
        ClrType::Decimal,
        ClrType::String,
        ClrType::DateOnly,
        ClrType::DateTimeOffset,
        ClrType::Guid,
        ClrType::Json,
        ClrType::array_of(ClrType::String),
    ];
    for ty in &types {
        for style in [LiteralStyle::VALUES, LiteralStyle::EXPRESSION] {
            assert_eq!(render_literal(&SqlValue::Null, Some(ty), style), "NULL");
        }
    }
}

#[test]
fn test_literal_rendering_is_deterministic() {
    let values = vec![
        SqlValue::string("O'Brien"),
        SqlValue::Bool(true),
        SqlValue::Decimal { mantissa: 1050, scale: 2 },
        SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Null]),
        SqlValue::Json(serde_json::json!({"k": [1, 2]})),
    ];
    for value in &values {
        let first = render_literal(value, None, LiteralStyle::VALUES);
        for _ in 0..3 {
            assert_eq!(render_literal(value, None, LiteralStyle::VALUES), first);
        }
    }
}

/// Both escaping forms stay in use: bulk statements escape with a
/// backslash, translated expressions double the quote.
#[test]
fn test_quote_escaping_per_call_site() {
    let name = SqlValue::string("O'Brien");
    assert_eq!(
        render_literal(&name, Some(&ClrType::String), LiteralStyle::VALUES),
        "'O\\'Brien'"
    );
    assert_eq!(
        render_literal(&name, Some(&ClrType::String), LiteralStyle::EXPRESSION),
        "'O''Brien'"
    );
}

#[test]
fn test_boolean_form_per_call_site() {
    let yes = SqlValue::Bool(true);
    assert_eq!(render_literal(&yes, Some(&ClrType::Bool), LiteralStyle::VALUES), "1");
    assert_eq!(render_literal(&yes, Some(&ClrType::Bool), LiteralStyle::EXPRESSION), "true");
}
