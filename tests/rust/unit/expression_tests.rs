use clickmap::errors::MappingError;
use clickmap::expression::{build_where_clause, collect_parameters, BinaryOperator, Expr, ExpressionTranslator};
use clickmap::metadata::{ColumnDescriptor, TableMetadata};
use clickmap::sql_formatter::SqlValue;
use clickmap::type_mapping::{ClrType, TypeMappingRegistry};

fn orders() -> TableMetadata {
    TableMetadata::new("orders")
        .with_column(ColumnDescriptor::new("Payload", ClrType::Json).named("Payload"))
        .with_column(ColumnDescriptor::new("Status", ClrType::String))
        .with_column(ColumnDescriptor::new("Labels", ClrType::array_of(ClrType::String)))
}

fn translate(expr: &Expr) -> Result<String, MappingError> {
    let columns = orders().column_map();
    let registry = TypeMappingRegistry::new();
    ExpressionTranslator::new(&columns, &registry).translate(expr)
}

#[test]
fn test_json_path_index_is_one_based_on_the_wire() {
    let expr = Expr::call(
        "JsonPath",
        Some(Expr::member("Payload")),
        vec![Expr::constant(SqlValue::string("items[0].name"))],
    );
    assert_eq!(translate(&expr).unwrap(), "\"Payload\".\"items\"[1].\"name\"");
}

#[test]
fn test_json_path_index_past_wire_range_is_malformed() {
    let expr = Expr::call(
        "JsonPath",
        Some(Expr::member("Payload")),
        vec![Expr::constant(SqlValue::string(format!("items[{}].name", usize::MAX)))],
    );
    assert!(matches!(
        translate(&expr),
        Err(MappingError::MalformedExpression { .. })
    ));
}

#[test]
fn test_table_column_types_drive_contains() {
    let on_array = Expr::call(
        "Contains",
        Some(Expr::member("Labels")),
        vec![Expr::constant(SqlValue::string("rush"))],
    );
    assert_eq!(translate(&on_array).unwrap(), "has(\"labels\", 'rush')");

    let on_string = Expr::call(
        "Contains",
        Some(Expr::member("Status")),
        vec![Expr::constant(SqlValue::string("ship"))],
    );
    assert_eq!(translate(&on_string).unwrap(), "(position(\"status\", 'ship') > 0)");
}

#[test]
fn test_where_clause_with_parameters() {
    let predicate = Expr::and(
        Expr::eq(Expr::member("Status"), Expr::parameter("status", ClrType::String)),
        Expr::binary(
            BinaryOperator::NotEqual,
            Expr::member("Payload"),
            Expr::constant(SqlValue::Null),
        ),
    );
    let columns = orders().column_map();
    let registry = TypeMappingRegistry::new();
    let translator = ExpressionTranslator::new(&columns, &registry);
    assert_eq!(
        build_where_clause(&predicate, &translator).unwrap(),
        "WHERE ((\"status\" = {status:String}) AND (\"Payload\" IS NOT NULL))"
    );
    assert_eq!(collect_parameters(&predicate), vec!["status"]);
}

#[test]
fn test_unknown_method_is_a_hard_error() {
    let expr = Expr::call("Soundex", Some(Expr::member("Status")), vec![]);
    assert!(matches!(
        translate(&expr),
        Err(MappingError::MalformedExpression { .. })
    ));
}
