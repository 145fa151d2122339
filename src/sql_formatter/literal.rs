//! Literal rendering
//!
//! Values are always inlined: the dialect's bulk statement forms reject bound
//! parameters, so every value reaching SQL text goes through [`render_literal`].
//!
//! Two call sites render differently and both behaviours are kept:
//!
//! | Style | Booleans | `'` in strings | Used by |
//! |---|---|---|---|
//! | [`LiteralStyle::VALUES`] | `1` / `0` | `\'` | INSERT VALUES, DELETE predicates, dictionary sources |
//! | [`LiteralStyle::EXPRESSION`] | `true` / `false` | `''` | expression translator constants |

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::type_mapping::{ClrType, EnumStorage};

/// A typed value to be rendered as SQL literal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact decimal: `mantissa * 10^-scale`
    Decimal { mantissa: i128, scale: u32 },
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Timezone-bearing timestamp, normalized to UTC when rendered
    DateTimeTz(DateTime<FixedOffset>),
    Uuid(Uuid),
    Enum { name: String, value: i64 },
    Bytes(Vec<u8>),
    Array(Vec<SqlValue>),
    /// Named fields of one nested/tuple element
    Record(Vec<(String, SqlValue)>),
    Json(serde_json::Value),
    /// Value of a kind with no dedicated rendering, carried as its display text
    Other(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        SqlValue::String(s.into())
    }

    /// Field of a [`SqlValue::Record`] by name
    pub fn field(&self, name: &str) -> Option<&SqlValue> {
        match self {
            SqlValue::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// JSON representation for `FORMAT JSONEachRow` bodies.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(i) => Value::from(*i),
            SqlValue::UInt(u) => Value::from(*u),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(format_float(*f))),
            // decimals travel as strings so no precision is lost in f64
            SqlValue::Decimal { mantissa, scale } => Value::String(format_decimal(*mantissa, *scale)),
            SqlValue::String(s) | SqlValue::Other(s) => Value::String(s.clone()),
            SqlValue::Date(d) => Value::String(format_date(d)),
            SqlValue::DateTime(dt) => Value::String(format_datetime(dt)),
            SqlValue::DateTimeTz(dt) => Value::String(format_datetime(&dt.with_timezone(&Utc).naive_utc())),
            SqlValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
            SqlValue::Enum { value, .. } => Value::from(*value),
            SqlValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            SqlValue::Array(items) => Value::Array(items.iter().map(SqlValue::to_json).collect()),
            SqlValue::Record(fields) => Value::Array(fields.iter().map(|(_, v)| v.to_json()).collect()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl From<&serde_json::Value> for SqlValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UInt(u)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => SqlValue::String(s.clone()),
            Value::Array(items) => SqlValue::Array(items.iter().map(SqlValue::from).collect()),
            Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolStyle {
    /// `1` / `0`
    Numeric,
    /// `true` / `false`
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// `'` becomes `\'`
    Backslash,
    /// `'` becomes `''`
    QuoteDoubling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralStyle {
    pub bool_style: BoolStyle,
    pub string_escape: StringEscape,
}

impl LiteralStyle {
    pub const VALUES: LiteralStyle = LiteralStyle {
        bool_style: BoolStyle::Numeric,
        string_escape: StringEscape::Backslash,
    };

    pub const EXPRESSION: LiteralStyle = LiteralStyle {
        bool_style: BoolStyle::Keyword,
        string_escape: StringEscape::QuoteDoubling,
    };
}

/// Render `value` as literal SQL text.
///
/// `declared` is the declared property type, when known. It narrows the
/// rendering for date-only columns and name-stored enums.
pub fn render_literal(value: &SqlValue, declared: Option<&ClrType>, style: LiteralStyle) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => match style.bool_style {
            BoolStyle::Numeric => (if *b { "1" } else { "0" }).to_string(),
            BoolStyle::Keyword => b.to_string(),
        },
        SqlValue::Int(i) => i.to_string(),
        SqlValue::UInt(u) => u.to_string(),
        SqlValue::Float(f) => format_float(*f),
        SqlValue::Decimal { mantissa, scale } => format_decimal(*mantissa, *scale),
        SqlValue::String(s) => quote_string(s, style.string_escape),
        SqlValue::Date(d) => format!("'{}'", format_date(d)),
        SqlValue::DateTime(dt) => match declared {
            Some(ClrType::DateOnly) => format!("'{}'", format_date(&dt.date())),
            _ => format!("'{}'", format_datetime(dt)),
        },
        SqlValue::DateTimeTz(dt) => {
            let utc = dt.with_timezone(&Utc).naive_utc();
            match declared {
                Some(ClrType::DateOnly) => format!("'{}'", format_date(&utc.date())),
                _ => format!("'{}'", format_datetime(&utc)),
            }
        }
        SqlValue::Uuid(u) => format!("'{}'", u.hyphenated()),
        SqlValue::Enum { name, value } => match declared {
            Some(ClrType::Enum(EnumStorage::Name)) => quote_string(name, style.string_escape),
            _ => value.to_string(),
        },
        SqlValue::Bytes(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 4 + 2);
            out.push('\'');
            for b in bytes {
                out.push_str(&format!("\\x{:02X}", b));
            }
            out.push('\'');
            out
        }
        SqlValue::Array(items) => {
            let element_type = match declared {
                Some(ClrType::Array(element)) => Some(element.as_ref()),
                _ => None,
            };
            let rendered: Vec<String> = items
                .iter()
                .map(|item| render_literal(item, element_type, style))
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        SqlValue::Record(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(_, v)| render_literal(v, None, style))
                .collect();
            format!("({})", rendered.join(", "))
        }
        SqlValue::Json(v) => quote_string(&v.to_string(), style.string_escape),
        SqlValue::Other(text) => {
            log::warn!(
                "Rendering value of unrecognized kind as a quoted string: {}",
                text
            );
            quote_string(text, style.string_escape)
        }
    }
}

/// Single-quote a string, escaping backslashes and quotes according to `escape`.
pub fn quote_string(s: &str, escape: StringEscape) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => match escape {
                StringEscape::Backslash => out.push_str("\\'"),
                StringEscape::QuoteDoubling => out.push_str("''"),
            },
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        f.to_string()
    }
}

fn format_decimal(mantissa: i128, scale: u32) -> String {
    let digits = mantissa.unsigned_abs().to_string();
    let sign = if mantissa < 0 { "-" } else { "" };
    if scale == 0 {
        return format!("{}{}", sign, digits);
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{}{}.{}", sign, int_part, frac_part)
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}
