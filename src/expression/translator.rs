//! Expression → ClickHouse SQL translation
//!
//! Translation is total over the supported grammar only: every node shape or
//! method outside it fails with [`MappingError::MalformedExpression`] naming
//! the node, so a predicate is never silently dropped.

use log::debug;

use crate::errors::{MappingError, Result};
use crate::metadata::ColumnNameMap;
use crate::sql_formatter::{
    quote_identifier, quote_string, render_literal, LiteralStyle, SqlValue, StringEscape,
};
use crate::type_mapping::TypeMappingRegistry;

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::json_path::JsonPath;
use super::methods::{get_method_spec, KnownMethod, TargetRule};

pub struct ExpressionTranslator<'a> {
    columns: &'a ColumnNameMap,
    registry: &'a TypeMappingRegistry,
}

impl<'a> ExpressionTranslator<'a> {
    pub fn new(columns: &'a ColumnNameMap, registry: &'a TypeMappingRegistry) -> Self {
        Self { columns, registry }
    }

    pub fn translate(&self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::MemberAccess { path } => self.member_access(path, expr),
            Expr::BinaryOp { op, left, right } => self.binary(*op, left, right),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => Ok(format!("NOT {}", self.translate(operand)?)),
                UnaryOperator::Negate => Ok(format!("-({})", self.translate(operand)?)),
                UnaryOperator::Convert(_) => self.translate(operand),
            },
            Expr::MethodCall { name, target, args } => {
                self.method_call(name, target.as_deref(), args, expr)
            }
            Expr::Constant { value, declared } => Ok(render_literal(
                value,
                declared.as_ref(),
                LiteralStyle::EXPRESSION,
            )),
            Expr::Parameter {
                name,
                declared,
                nullable,
            } => {
                let ty = self.registry.parameter_type(declared, *nullable)?;
                placeholder(name, &ty, expr)
            }
        }
    }

    fn member_access(&self, path: &[String], node: &Expr) -> Result<String> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| MappingError::malformed(node, "member access with an empty path"))?;
        let mut sql = quote_identifier(&self.columns.column_for(first));
        for segment in rest {
            sql.push('.');
            sql.push_str(&quote_identifier(segment));
        }
        Ok(sql)
    }

    fn binary(&self, op: BinaryOperator, left: &Expr, right: &Expr) -> Result<String> {
        if matches!(op, BinaryOperator::Equal | BinaryOperator::NotEqual)
            && (left.is_null_constant() || right.is_null_constant())
        {
            let operand = if left.is_null_constant() { right } else { left };
            let check = if op == BinaryOperator::Equal {
                "IS NULL"
            } else {
                "IS NOT NULL"
            };
            return Ok(format!("({} {})", self.translate(operand)?, check));
        }

        if op == BinaryOperator::Add && (self.is_string_expr(left) || self.is_string_expr(right)) {
            let mut parts = Vec::new();
            self.flatten_concat(left, &mut parts)?;
            self.flatten_concat(right, &mut parts)?;
            return Ok(format!("concat({})", parts.join(", ")));
        }

        let left_sql = self.translate(left)?;
        let right_sql = self.translate(right)?;
        match op.sql_symbol() {
            Some(symbol) => Ok(format!("({} {} {})", left_sql, symbol, right_sql)),
            None => Ok(format!("ifNull({}, {})", left_sql, right_sql)),
        }
    }

    /// Flatten nested string `+` into one `concat()` argument list
    fn flatten_concat(&self, expr: &Expr, parts: &mut Vec<String>) -> Result<()> {
        match expr {
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                left,
                right,
            } if self.is_string_expr(expr) => {
                self.flatten_concat(left, parts)?;
                self.flatten_concat(right, parts)
            }
            _ => {
                parts.push(self.translate(expr)?);
                Ok(())
            }
        }
    }

    fn is_string_expr(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Constant { .. } => expr.as_string_constant().is_some(),
            Expr::MemberAccess { path } if path.len() == 1 => self
                .columns
                .type_of(&path[0])
                .is_some_and(|ty| ty.is_string()),
            Expr::MethodCall { name, .. } => matches!(
                get_method_spec(name).map(|s| s.method),
                Some(KnownMethod::ToLower | KnownMethod::ToUpper)
            ),
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                left,
                right,
            } => self.is_string_expr(left) || self.is_string_expr(right),
            Expr::UnaryOp {
                op: UnaryOperator::Convert(ty),
                ..
            } => ty.is_string(),
            _ => false,
        }
    }

    fn is_array_expr(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Constant { value, declared } => {
                matches!(value, SqlValue::Array(_)) || declared.as_ref().is_some_and(|ty| ty.is_array())
            }
            Expr::MemberAccess { path } if path.len() == 1 => self
                .columns
                .type_of(&path[0])
                .is_some_and(|ty| ty.is_array()),
            Expr::Parameter { declared, .. } => declared.is_array(),
            Expr::UnaryOp {
                op: UnaryOperator::Convert(ty),
                ..
            } => ty.is_array(),
            _ => false,
        }
    }

    fn method_call(
        &self,
        name: &str,
        target: Option<&Expr>,
        args: &[Expr],
        node: &Expr,
    ) -> Result<String> {
        let spec = get_method_spec(name).ok_or_else(|| {
            MappingError::malformed(node, format!("method '{}' is not supported", name))
        })?;

        match (spec.target, target.is_some()) {
            (TargetRule::Required, false) => {
                return Err(MappingError::malformed(node, format!("'{}' needs a target", name)))
            }
            (TargetRule::Forbidden, true) => {
                return Err(MappingError::malformed(
                    node,
                    format!("'{}' does not take a target", name),
                ))
            }
            _ => {}
        }
        if args.len() < spec.min_args || args.len() > spec.max_args {
            return Err(MappingError::malformed(
                node,
                format!(
                    "'{}' takes {}..={} arguments, got {}",
                    name,
                    spec.min_args,
                    spec.max_args,
                    args.len()
                ),
            ));
        }

        debug!("Translating method call {:?}", spec.method);

        let target_sql = || -> Result<String> {
            match target {
                Some(t) => self.translate(t),
                None => Err(MappingError::malformed(node, "missing target")),
            }
        };
        let arg_sql = |i: usize| self.translate(&args[i]);
        let string_arg = |i: usize, what: &str| -> Result<String> {
            args[i]
                .as_string_constant()
                .map(str::to_string)
                .ok_or_else(|| MappingError::malformed(node, format!("{} must be a string constant", what)))
        };

        match spec.method {
            KnownMethod::GetParameter => {
                let param_name = string_arg(0, "parameter name")?;
                let ty = match args.get(1) {
                    Some(override_arg) => override_arg
                        .as_string_constant()
                        .filter(|t| !t.trim().is_empty() && !t.contains(['{', '}']))
                        .map(|t| t.trim().to_string())
                        .ok_or_else(|| {
                            MappingError::malformed(node, "parameter type override must be a type name")
                        })?,
                    None => match &args[0] {
                        Expr::Constant {
                            declared: Some(declared),
                            ..
                        } => self.registry.parameter_type(declared, false)?,
                        _ => {
                            return Err(MappingError::malformed(
                                node,
                                "parameter type is neither declared nor overridden",
                            ))
                        }
                    },
                };
                placeholder(&param_name, &ty, node)
            }
            KnownMethod::DictGet => Ok(format!(
                "dictGet({}, {}, {})",
                quote_string(&string_arg(0, "dictionary name")?, StringEscape::QuoteDoubling),
                quote_string(&string_arg(1, "attribute name")?, StringEscape::QuoteDoubling),
                arg_sql(2)?
            )),
            KnownMethod::DictGetOrDefault => Ok(format!(
                "dictGetOrDefault({}, {}, {}, {})",
                quote_string(&string_arg(0, "dictionary name")?, StringEscape::QuoteDoubling),
                quote_string(&string_arg(1, "attribute name")?, StringEscape::QuoteDoubling),
                arg_sql(2)?,
                arg_sql(3)?
            )),
            KnownMethod::DictHas => Ok(format!(
                "dictHas({}, {})",
                quote_string(&string_arg(0, "dictionary name")?, StringEscape::QuoteDoubling),
                arg_sql(1)?
            )),
            KnownMethod::JsonPath => {
                if !matches!(target, Some(Expr::MemberAccess { .. })) {
                    return Err(MappingError::malformed(
                        node,
                        "JSON paths apply to a column only",
                    ));
                }
                let path = JsonPath::parse(&string_arg(0, "JSON path")?)?;
                Ok(path.render(&target_sql()?))
            }
            KnownMethod::Contains => match target {
                Some(t) if self.is_string_expr(t) => {
                    Ok(format!("(position({}, {}) > 0)", target_sql()?, arg_sql(0)?))
                }
                Some(t) if self.is_array_expr(t) => Ok(format!("has({}, {})", target_sql()?, arg_sql(0)?)),
                _ => Err(MappingError::malformed(
                    node,
                    "Contains target must be a known string or array; declare the column type",
                )),
            },
            KnownMethod::Any => Ok(format!("notEmpty({})", target_sql()?)),
            KnownMethod::Count => match (target.is_some(), args.len()) {
                (true, 0) => Ok(format!("length({})", target_sql()?)),
                (false, 0) => Ok("count()".to_string()),
                (false, _) => Ok(format!("countIf({})", arg_sql(0)?)),
                (true, _) => Err(MappingError::malformed(
                    node,
                    "counting a collection with a predicate is not supported",
                )),
            },
            KnownMethod::StartsWith => Ok(format!("startsWith({}, {})", target_sql()?, arg_sql(0)?)),
            KnownMethod::EndsWith => Ok(format!("endsWith({}, {})", target_sql()?, arg_sql(0)?)),
            KnownMethod::ToLower => Ok(format!("lower({})", target_sql()?)),
            KnownMethod::ToUpper => Ok(format!("upper({})", target_sql()?)),
            KnownMethod::Sum | KnownMethod::Min | KnownMethod::Max | KnownMethod::Average => {
                let (aggregate, array_fn) = match spec.method {
                    KnownMethod::Sum => ("sum", "arraySum"),
                    KnownMethod::Min => ("min", "arrayMin"),
                    KnownMethod::Max => ("max", "arrayMax"),
                    _ => ("avg", "arrayAvg"),
                };
                match (target.is_some(), args.len()) {
                    (true, 0) => Ok(format!("{}({})", array_fn, target_sql()?)),
                    (false, 1) => Ok(format!("{}({})", aggregate, arg_sql(0)?)),
                    _ => Err(MappingError::malformed(
                        node,
                        "aggregate takes either a collection target or one argument",
                    )),
                }
            }
        }
    }
}

/// `{name:Type}` placeholder for parameterized views
fn placeholder(name: &str, ty: &str, node: &Expr) -> Result<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MappingError::malformed(
            node,
            format!("invalid parameter name '{}'", name),
        ));
    }
    Ok(format!("{{{}:{}}}", name, ty))
}
