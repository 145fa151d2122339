//! WHERE clauses for parameterized views
//!
//! A view predicate is translated like any other expression; named
//! parameters stay as `{name:Type}` placeholders and are bound at query time
//! (`SELECT * FROM view(name = value)`).

use crate::errors::{MappingError, Result};
use crate::sql_formatter::SqlValue;

use super::ast::Expr;
use super::methods::{get_method_spec, KnownMethod};
use super::translator::ExpressionTranslator;

/// `WHERE <predicate>`
pub fn build_where_clause(predicate: &Expr, translator: &ExpressionTranslator<'_>) -> Result<String> {
    if let Expr::Constant { value, .. } = predicate {
        if !matches!(value, SqlValue::Bool(_)) {
            return Err(MappingError::malformed(
                predicate,
                "a view predicate must be a boolean expression",
            ));
        }
    }
    Ok(format!("WHERE {}", translator.translate(predicate)?))
}

/// Parameter names referenced by `expr`, in order of first appearance.
pub fn collect_parameters(expr: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    collect_into(expr, &mut names);
    names
}

fn collect_into(expr: &Expr, names: &mut Vec<String>) {
    let push = |name: &str, names: &mut Vec<String>| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    match expr {
        Expr::Parameter { name, .. } => push(name, names),
        Expr::BinaryOp { left, right, .. } => {
            collect_into(left, names);
            collect_into(right, names);
        }
        Expr::UnaryOp { operand, .. } => collect_into(operand, names),
        Expr::MethodCall { name, target, args } => {
            let is_parameter = get_method_spec(name)
                .is_some_and(|spec| spec.method == KnownMethod::GetParameter);
            if is_parameter {
                if let Some(param) = args.first().and_then(Expr::as_string_constant) {
                    push(param, names);
                }
                return;
            }
            if let Some(target) = target {
                collect_into(target, names);
            }
            for arg in args {
                collect_into(arg, names);
            }
        }
        Expr::MemberAccess { .. } | Expr::Constant { .. } => {}
    }
}
