//! Statements handed to the execution layer
//!
//! Every builder produces complete, self-contained SQL text. The only part
//! filled in later is an `<env:NAME>` placeholder, which is resolved right
//! before execution so secrets never enter a plan.

use std::collections::HashMap;
use std::fmt;

use crate::metadata::ENV_PLACEHOLDER_PREFIX as ENV_PREFIX;
use crate::sql_formatter::{quote_string, StringEscape};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    /// Affected table (`db.table` or `table`), for logging
    pub table: Option<String>,
    /// Environment variables referenced by placeholders in `sql`
    pub env_bindings: Vec<String>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            table: Some(table.into()),
            env_bindings: Vec::new(),
        }
    }

    pub fn with_env_bindings(mut self, bindings: Vec<String>) -> Self {
        self.env_bindings = bindings;
        self
    }

    pub fn requires_environment(&self) -> bool {
        !self.env_bindings.is_empty()
    }

    /// Substitute every env placeholder with the quoted value from `lookup`.
    ///
    /// The text is scanned once, left to right. Substituted values are never
    /// rescanned, and placeholder-like text inside quoted literals or
    /// identifiers is left alone. Returns the name of the first variable
    /// `lookup` cannot provide.
    pub fn resolve<F>(&self, lookup: F) -> Result<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.env_bindings.is_empty() {
            return Ok(self.sql.clone());
        }

        let mut values = HashMap::with_capacity(self.env_bindings.len());
        for name in &self.env_bindings {
            let value = lookup(name).ok_or_else(|| name.clone())?;
            values.insert(name.as_str(), quote_string(&value, StringEscape::Backslash));
        }

        let sql = self.sql.as_str();
        let mut out = String::with_capacity(sql.len());
        let mut quote: Option<char> = None;
        let mut rest = sql;
        while let Some(c) = rest.chars().next() {
            match quote {
                Some('\'') if c == '\\' => {
                    // escaped character stays inside the literal
                    let escaped = rest[1..].chars().next().map_or(0, char::len_utf8);
                    out.push_str(&rest[..1 + escaped]);
                    rest = &rest[1 + escaped..];
                    continue;
                }
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => quote = Some(c),
                None if rest.starts_with(ENV_PREFIX) => {
                    let substituted = rest[ENV_PREFIX.len()..].find('>').and_then(|end| {
                        let name = &rest[ENV_PREFIX.len()..ENV_PREFIX.len() + end];
                        values.get(name).map(|value| (value, ENV_PREFIX.len() + end + 1))
                    });
                    if let Some((value, consumed)) = substituted {
                        out.push_str(value);
                        rest = &rest[consumed..];
                        continue;
                    }
                }
                None => {}
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        Ok(out)
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_quoted_values() {
        let stmt = SqlStatement::new("SOURCE(POSTGRESQL(PASSWORD <env:PG_PW>))", "dict")
            .with_env_bindings(vec!["PG_PW".to_string()]);
        let sql = stmt
            .resolve(|name| (name == "PG_PW").then(|| "s3cr'et".to_string()))
            .unwrap();
        assert_eq!(sql, "SOURCE(POSTGRESQL(PASSWORD 's3cr\\'et'))");
    }

    #[test]
    fn test_resolve_reports_missing_variable() {
        let stmt = SqlStatement::new("x <env:A>", "t").with_env_bindings(vec!["A".to_string()]);
        assert_eq!(stmt.resolve(|_| None), Err("A".to_string()));
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let stmt = SqlStatement::new("SOURCE(HTTP(URL <env:A> PASSWORD <env:B>))", "dict")
            .with_env_bindings(vec!["A".to_string(), "B".to_string()]);
        let sql = stmt
            .resolve(|name| match name {
                "A" => Some("http://x/<env:B>".to_string()),
                "B" => Some("p'w".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(sql, "SOURCE(HTTP(URL 'http://x/<env:B>' PASSWORD 'p\\'w'))");
    }

    #[test]
    fn test_placeholder_text_inside_literals_is_kept() {
        let stmt = SqlStatement::new(
            "COMMENT 'use <env:PW> and it\\'s <env:PW>' \"<env:PW>\" PASSWORD <env:PW>",
            "t",
        )
        .with_env_bindings(vec!["PW".to_string()]);
        let sql = stmt.resolve(|_| Some("s".to_string())).unwrap();
        assert_eq!(
            sql,
            "COMMENT 'use <env:PW> and it\\'s <env:PW>' \"<env:PW>\" PASSWORD 's'"
        );
    }

    #[test]
    fn test_unbound_placeholder_left_untouched() {
        let stmt = SqlStatement::new("x <env:OTHER> <env:A", "t").with_env_bindings(vec!["A".to_string()]);
        assert_eq!(stmt.resolve(|_| Some("v".to_string())).unwrap(), "x <env:OTHER> <env:A");
    }

    #[test]
    fn test_statement_without_bindings_is_unchanged() {
        let stmt = SqlStatement::new("SELECT 1", "t");
        assert!(!stmt.requires_environment());
        assert_eq!(stmt.resolve(|_| None).unwrap(), "SELECT 1");
    }
}
