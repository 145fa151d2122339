//! Expression tree handed to the translator
//!
//! Trees are built by the caller from its query/predicate representation and
//! consumed by exactly one translation pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sql_formatter::SqlValue;
use crate::type_mapping::ClrType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    /// `a ?? b`
    Coalesce,
}

impl BinaryOperator {
    /// Infix SQL form; `None` for operators rendered as a function call
    pub fn sql_symbol(&self) -> Option<&'static str> {
        match self {
            BinaryOperator::Equal => Some("="),
            BinaryOperator::NotEqual => Some("!="),
            BinaryOperator::LessThan => Some("<"),
            BinaryOperator::LessThanOrEqual => Some("<="),
            BinaryOperator::GreaterThan => Some(">"),
            BinaryOperator::GreaterThanOrEqual => Some(">="),
            BinaryOperator::AndAlso => Some("AND"),
            BinaryOperator::OrElse => Some("OR"),
            BinaryOperator::Add => Some("+"),
            BinaryOperator::Subtract => Some("-"),
            BinaryOperator::Multiply => Some("*"),
            BinaryOperator::Divide => Some("/"),
            BinaryOperator::Modulo => Some("%"),
            BinaryOperator::Coalesce => None,
        }
    }

    fn display_symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::Coalesce => "??",
            other => other.sql_symbol().unwrap_or("?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Negate,
    /// Numeric or reference conversion; produces no SQL of its own
    Convert(ClrType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Property path on the query's range variable
    MemberAccess { path: Vec<String> },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    MethodCall {
        name: String,
        #[serde(default)]
        target: Option<Box<Expr>>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Constant {
        value: SqlValue,
        #[serde(default)]
        declared: Option<ClrType>,
    },
    /// Named query parameter, rendered as `{name:Type}`
    Parameter {
        name: String,
        declared: ClrType,
        #[serde(default)]
        nullable: bool,
    },
}

impl Expr {
    pub fn member(property: impl Into<String>) -> Self {
        Expr::MemberAccess {
            path: vec![property.into()],
        }
    }

    pub fn member_path<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::MemberAccess {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn constant(value: SqlValue) -> Self {
        Expr::Constant {
            value,
            declared: None,
        }
    }

    pub fn typed_constant(value: SqlValue, declared: ClrType) -> Self {
        Expr::Constant {
            value,
            declared: Some(declared),
        }
    }

    pub fn parameter(name: impl Into<String>, declared: ClrType) -> Self {
        Expr::Parameter {
            name: name.into(),
            declared,
            nullable: false,
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Equal, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::AndAlso, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::OrElse, left, right)
    }

    pub fn not(operand: Expr) -> Self {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    pub fn convert(operand: Expr, to: ClrType) -> Self {
        Expr::UnaryOp {
            op: UnaryOperator::Convert(to),
            operand: Box::new(operand),
        }
    }

    pub fn call(name: impl Into<String>, target: Option<Expr>, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            name: name.into(),
            target: target.map(Box::new),
            args,
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self, Expr::Constant { value, .. } if value.is_null())
    }

    pub fn as_string_constant(&self) -> Option<&str> {
        match self {
            Expr::Constant {
                value: SqlValue::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }
}

/// Caller-facing textual form, used in error messages
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::MemberAccess { path } => write!(f, "x.{}", path.join(".")),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.display_symbol(), right)
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => write!(f, "!{}", operand),
                UnaryOperator::Negate => write!(f, "-{}", operand),
                UnaryOperator::Convert(ty) => write!(f, "({}){}", ty, operand),
            },
            Expr::MethodCall { name, target, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                match target {
                    Some(target) => write!(f, "{}.{}({})", target, name, args.join(", ")),
                    None => write!(f, "{}({})", name, args.join(", ")),
                }
            }
            Expr::Constant { value, .. } => match value {
                SqlValue::String(s) => write!(f, "\"{}\"", s),
                SqlValue::Null => f.write_str("null"),
                other => write!(f, "{:?}", other),
            },
            Expr::Parameter { name, .. } => write!(f, "@{}", name),
        }
    }
}
