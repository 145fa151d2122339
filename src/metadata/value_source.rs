//! Connection parameters that are either literal or read from the environment
//!
//! Environment-sourced values are never read while planning. They render as an
//! `<env:NAME>` placeholder and the statement records the binding; the runner
//! substitutes the value right before execution.

use serde::{Deserialize, Serialize};

use crate::errors::{MappingError, Result};
use crate::sql_formatter::{quote_string, StringEscape};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValueSource {
    Env { env: String },
    Literal(String),
}

impl ValueSource {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueSource::Literal(value.into())
    }

    pub fn env(name: impl Into<String>) -> Self {
        ValueSource::Env { env: name.into() }
    }

    /// Render as a string literal or an env placeholder, recording the
    /// variable name in `bindings`.
    pub fn render(&self, bindings: &mut Vec<String>) -> Result<String> {
        match self {
            ValueSource::Literal(value) => Ok(quote_string(value, StringEscape::Backslash)),
            ValueSource::Env { env } => {
                if env.is_empty() || !env.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(MappingError::configuration(format!(
                        "invalid environment variable name '{}'",
                        env
                    )));
                }
                if !bindings.contains(env) {
                    bindings.push(env.clone());
                }
                Ok(env_placeholder(env))
            }
        }
    }
}

impl From<&str> for ValueSource {
    fn from(value: &str) -> Self {
        ValueSource::Literal(value.to_string())
    }
}

pub(crate) const ENV_PLACEHOLDER_PREFIX: &str = "<env:";

pub fn env_placeholder(name: &str) -> String {
    format!("{}{}>", ENV_PLACEHOLDER_PREFIX, name)
}
