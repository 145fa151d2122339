//! JSON subcolumn paths
//!
//! Callers write paths as `items[0].name` with 0-based indexes; the wire form
//! is a chain of quoted segments with 1-based indexes:
//! `"Payload"."items"[1]."name"`.

use crate::errors::{MappingError, Result};
use crate::sql_formatter::quote_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPathSegment {
    pub name: String,
    /// 0-based index as supplied by the caller
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    pub segments: Vec<JsonPathSegment>,
}

impl JsonPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = |reason: &str| MappingError::malformed(format!("json path '{}'", raw), reason);

        if raw.trim().is_empty() {
            return Err(malformed("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (name, index) = match part.find('[') {
                Some(open) => {
                    let close = part
                        .strip_suffix(']')
                        .ok_or_else(|| malformed("unterminated index"))?;
                    let index_text = &close[open + 1..];
                    let index = index_text
                        .parse::<usize>()
                        .map_err(|_| malformed("index must be a non-negative integer"))?;
                    if index.checked_add(1).is_none() {
                        return Err(malformed("index out of range"));
                    }
                    (&part[..open], Some(index))
                }
                None => (part, None),
            };
            if name.is_empty() {
                return Err(malformed("empty segment"));
            }
            if name.contains(']') {
                return Err(malformed("stray ']'"));
            }
            segments.push(JsonPathSegment {
                name: name.to_string(),
                index,
            });
        }
        Ok(Self { segments })
    }

    /// Render below an already-quoted column reference.
    pub fn render(&self, column_sql: &str) -> String {
        let mut sql = column_sql.to_string();
        for segment in &self.segments {
            sql.push('.');
            sql.push_str(&quote_identifier(&segment.name));
            if let Some(index) = segment.index {
                sql.push_str(&format!("[{}]", index as u128 + 1));
            }
        }
        sql
    }
}
